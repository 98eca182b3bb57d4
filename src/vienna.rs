use crate::rna_sequence::RnaSequence;
use serde::{Deserialize, Serialize};
use std::{fmt, fs};

/// A pre-supplied secondary structure: one sequence plus its dot-bracket
/// string, as found in Vienna-format files. The structure line may carry a
/// trailing free-energy annotation, eg `((...)). (-3.40)`, which is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViennaStructure {
    name: Option<String>,
    sequence: Vec<u8>,
    structure: String,
}

#[derive(Debug, Clone)]
pub enum ViennaError {
    MissingSequence,
    MissingStructure,
    LengthMismatch {
        sequence: usize,
        structure: usize,
    },
    Unbalanced {
        position: usize,
    },
    InvalidStructureChar {
        position: usize,
        found: char,
    },
    Io {
        message: String,
    },
}

impl fmt::Display for ViennaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSequence => write!(f, "Vienna record has no sequence line"),
            Self::MissingStructure => write!(f, "Vienna record has no structure line"),
            Self::LengthMismatch {
                sequence,
                structure,
            } => write!(
                f,
                "sequence length {} does not match structure length {}",
                sequence, structure
            ),
            Self::Unbalanced { position } => {
                write!(f, "unbalanced bracket at structure position {}", position)
            }
            Self::InvalidStructureChar { position, found } => write!(
                f,
                "invalid structure character '{}' at position {}",
                found, position
            ),
            Self::Io { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ViennaError {}

impl ViennaStructure {
    pub fn from_file(filename: &str) -> Result<Self, ViennaError> {
        let text = fs::read_to_string(filename).map_err(|e| ViennaError::Io {
            message: format!("Could not read Vienna file '{filename}': {e}"),
        })?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, ViennaError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let mut name = None;
        let mut first = lines.next().ok_or(ViennaError::MissingSequence)?;
        if let Some(header) = first.strip_prefix('>') {
            name = Some(header.trim().to_string());
            first = lines.next().ok_or(ViennaError::MissingSequence)?;
        }

        let sequence = RnaSequence::validate_rna_sequence(first.as_bytes());
        let structure_line = lines.next().ok_or(ViennaError::MissingStructure)?;
        let structure = Self::strip_energy(structure_line);
        Self::check_brackets(&structure)?;

        if sequence.len() != structure.len() {
            return Err(ViennaError::LengthMismatch {
                sequence: sequence.len(),
                structure: structure.len(),
            });
        }

        Ok(Self {
            name,
            sequence,
            structure,
        })
    }

    fn strip_energy(line: &str) -> String {
        line.split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn check_brackets(structure: &str) -> Result<(), ViennaError> {
        let mut depth: usize = 0;
        for (position, c) in structure.chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or(ViennaError::Unbalanced { position })?
                }
                '.' => {}
                found => return Err(ViennaError::InvalidStructureChar { position, found }),
            }
        }
        if depth != 0 {
            return Err(ViennaError::Unbalanced {
                position: structure.len(),
            });
        }
        Ok(())
    }

    #[inline(always)]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn name(&self) -> &Option<String> {
        &self.name
    }

    pub fn display_id(&self) -> String {
        match &self.name {
            Some(name) => name.to_owned(),
            None => "structure".to_string(),
        }
    }
}
