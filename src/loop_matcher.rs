//! Matching collaborator: one pass of pattern matching against a sequence or
//! a secondary structure. The task engine only sees the [`MatchPass`] trait;
//! [`HairpinScanner`] is the default implementation.

use crate::{
    fold::DEFAULT_TEMPERATURE,
    iupac_code::IupacCode,
    rna_sequence::RnaSequence,
    sink::{LoopRow, ResultSink, SinkError},
    vienna::ViennaStructure,
};
use itertools::Itertools;
use std::fmt;

/// Matching bounds and flags, immutable for the lifetime of a task.
#[derive(Debug, Clone)]
pub struct MatchParams {
    pub min_length: usize,
    pub max_length: usize,
    pub additional_sequence: Option<String>,
    pub temperature: i32,
    pub avoid_lonely_pairs: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 16,
            additional_sequence: None,
            temperature: DEFAULT_TEMPERATURE,
            avoid_lonely_pairs: false,
        }
    }
}

/// What a pass scans: a bare sequence, a sequence with a computed structure,
/// or a pre-supplied structure record.
#[derive(Debug, Clone, Copy)]
pub enum MatchSubject<'a> {
    Plain {
        sequence: &'a RnaSequence,
    },
    Folded {
        sequence: &'a RnaSequence,
        structure: &'a str,
    },
    Supplied {
        vienna: &'a ViennaStructure,
    },
}

#[derive(Debug)]
pub enum MatchError {
    InvalidPattern { pattern: String },
    Sink(SinkError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern } => {
                write!(f, "pattern '{pattern}' contains non-IUPAC letters")
            }
            Self::Sink(e) => write!(f, "could not write match row: {e}"),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<SinkError> for MatchError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err)
    }
}

pub trait MatchPass: Send + Sync {
    /// Runs one matching pass, appending zero or more rows to the sink.
    /// With `reverse` set the pass looks for the motif on the opposite
    /// strand (the reverse complement of the pattern).
    fn run(
        &self,
        subject: MatchSubject<'_>,
        pattern: &str,
        sink: &dyn ResultSink,
        reverse: bool,
        params: &MatchParams,
    ) -> Result<(), MatchError>;
}

/// A hairpin loop: the unpaired run between a stem's closing brackets.
#[derive(Debug, Clone, PartialEq)]
struct HairpinLoop {
    start: usize,
    len: usize,
    stem_len: usize,
}

#[derive(Debug, Default)]
pub struct HairpinScanner;

impl HairpinScanner {
    fn pattern_codes(pattern: &str) -> Result<Vec<IupacCode>, MatchError> {
        let codes: Vec<IupacCode> = pattern.bytes().map(IupacCode::from_letter).collect();
        if codes.is_empty() || codes.iter().any(|c| c.is_empty()) {
            return Err(MatchError::InvalidPattern {
                pattern: pattern.to_string(),
            });
        }
        Ok(codes)
    }

    fn matches_at(sequence: &[u8], pos: usize, codes: &[IupacCode]) -> bool {
        if pos + codes.len() > sequence.len() {
            return false;
        }
        codes
            .iter()
            .zip(&sequence[pos..pos + codes.len()])
            .all(|(code, base)| !code.subset(IupacCode::from_letter(*base)).is_empty())
    }

    fn occurs_anywhere(sequence: &[u8], codes: &[IupacCode]) -> bool {
        if codes.len() > sequence.len() {
            return false;
        }
        (0..=sequence.len() - codes.len()).any(|pos| Self::matches_at(sequence, pos, codes))
    }

    /// Finds hairpin loops in a dot-bracket string: a run of `(`, a run of
    /// `.` within the length bounds, a run of `)`.
    fn hairpin_loops(structure: &str, params: &MatchParams) -> Vec<HairpinLoop> {
        let chunks = structure.char_indices().chunk_by(|&(_, c)| c);
        let mut runs: Vec<(char, usize, usize)> = Vec::new();
        for (c, mut group) in &chunks {
            if let Some((start, _)) = group.next() {
                runs.push((c, start, 1 + group.count()));
            }
        }

        runs.windows(3)
            .filter_map(|w| {
                let [(open, _, stem_len), (dot, start, len), (close, _, _)] = w else {
                    return None;
                };
                if *open != '(' || *dot != '.' || *close != ')' {
                    return None;
                }
                if *len < params.min_length || *len > params.max_length {
                    return None;
                }
                // a single closing pair is a lonely pair
                if params.avoid_lonely_pairs && *stem_len == 1 {
                    return None;
                }
                Some(HairpinLoop {
                    start: *start,
                    len: *len,
                    stem_len: *stem_len,
                })
            })
            .collect()
    }

    fn scan_loops(
        sequence: &[u8],
        structure: &str,
        sequence_id: &str,
        pattern: &str,
        codes: &[IupacCode],
        strand: char,
        sink: &dyn ResultSink,
        params: &MatchParams,
    ) -> Result<(), MatchError> {
        for hairpin in Self::hairpin_loops(structure, params) {
            if codes.len() > hairpin.len {
                continue;
            }
            for offset in 0..=hairpin.len - codes.len() {
                let position = hairpin.start + offset;
                if Self::matches_at(sequence, position, codes) {
                    let loop_seq =
                        String::from_utf8_lossy(&sequence[hairpin.start..hairpin.start + hairpin.len])
                            .to_string();
                    sink.append(LoopRow {
                        sequence_id: sequence_id.to_string(),
                        pattern: pattern.to_string(),
                        strand,
                        position,
                        loop_start: Some(hairpin.start),
                        loop_len: Some(hairpin.len),
                        loop_seq: Some(loop_seq),
                        structure: Some(local_structure(structure, &hairpin)),
                    })?;
                }
            }
        }
        Ok(())
    }

    fn scan_plain(
        sequence: &[u8],
        sequence_id: &str,
        pattern: &str,
        codes: &[IupacCode],
        strand: char,
        sink: &dyn ResultSink,
    ) -> Result<(), MatchError> {
        if codes.len() > sequence.len() {
            return Ok(());
        }
        for position in 0..=sequence.len() - codes.len() {
            if Self::matches_at(sequence, position, codes) {
                sink.append(LoopRow {
                    sequence_id: sequence_id.to_string(),
                    pattern: pattern.to_string(),
                    strand,
                    position,
                    loop_start: None,
                    loop_len: None,
                    loop_seq: None,
                    structure: None,
                })?;
            }
        }
        Ok(())
    }
}

/// Dot-bracket context of one hairpin, stem included.
fn local_structure(structure: &str, hairpin: &HairpinLoop) -> String {
    let from = hairpin.start.saturating_sub(hairpin.stem_len);
    let to = (hairpin.start + hairpin.len + hairpin.stem_len).min(structure.len());
    structure[from..to].to_string()
}

impl MatchPass for HairpinScanner {
    fn run(
        &self,
        subject: MatchSubject<'_>,
        pattern: &str,
        sink: &dyn ResultSink,
        reverse: bool,
        params: &MatchParams,
    ) -> Result<(), MatchError> {
        let mut codes = Self::pattern_codes(pattern)?;
        let strand = if reverse {
            codes = codes.iter().rev().map(|c| c.complement()).collect();
            '-'
        } else {
            '+'
        };

        // The additional reference sequence acts as a filter: the motif
        // must be present there as well before any loop is reported.
        if let Some(extra) = &params.additional_sequence {
            let extra = RnaSequence::validate_rna_sequence(extra.as_bytes());
            if !Self::occurs_anywhere(&extra, &codes) {
                return Ok(());
            }
        }

        match subject {
            MatchSubject::Plain { sequence } => Self::scan_plain(
                sequence.forward(),
                &sequence.display_id(),
                pattern,
                &codes,
                strand,
                sink,
            ),
            MatchSubject::Folded {
                sequence,
                structure,
            } => Self::scan_loops(
                sequence.forward(),
                structure,
                &sequence.display_id(),
                pattern,
                &codes,
                strand,
                sink,
                params,
            ),
            MatchSubject::Supplied { vienna } => Self::scan_loops(
                vienna.sequence(),
                vienna.structure(),
                &vienna.display_id(),
                pattern,
                &codes,
                strand,
                sink,
                params,
            ),
        }
    }
}
