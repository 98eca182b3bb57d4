use crate::iupac_code::IupacCode;
use anyhow::Result;
use bio::io::fasta;
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File};

/// Identifiers longer than this get truncated in size-limit diagnostics.
const ID_DISPLAY_MAX: usize = 15;

type RNAstring = Vec<u8>;

/// One input sequence, normalized to the uppercase RNA alphabet
/// (whitespace stripped, `T` mapped to `U`, anything non-IUPAC to `N`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RnaSequence {
    name: Option<String>,
    description: Vec<String>,
    seq: RNAstring,
}

impl RnaSequence {
    pub fn from_sequence(sequence: &str) -> Result<RnaSequence> {
        Ok(RnaSequence::from_u8(sequence.as_bytes()))
    }

    pub fn from_fasta_file(filename: &str) -> Result<Vec<RnaSequence>> {
        let file = File::open(filename)?;
        Ok(fasta::Reader::new(file)
            .records()
            .filter_map(|record| record.ok())
            .map(|record| RnaSequence::from_fasta_record(&record))
            .collect())
    }

    pub fn from_fasta_record(record: &fasta::Record) -> Self {
        let mut ret = Self::from_u8(record.seq());
        ret.name = Some(record.id().to_string());
        if let Some(desc) = record.desc() {
            ret.description.push(desc.to_string());
        }
        ret
    }

    fn from_u8(s: &[u8]) -> Self {
        Self {
            name: None,
            description: vec![],
            seq: Self::validate_rna_sequence(s),
        }
    }

    pub fn validate_rna_sequence(v: &[u8]) -> Vec<u8> {
        v.iter()
            .filter(|c| !c.is_ascii_whitespace())
            .map(|c| match c.to_ascii_uppercase() {
                b'T' => b'U',
                c if IupacCode::is_valid_letter(c) => c,
                _ => b'N',
            })
            .collect()
    }

    #[inline(always)]
    pub fn forward(&self) -> &[u8] {
        &self.seq
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn name(&self) -> &Option<String> {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub fn description(&self) -> &Vec<String> {
        &self.description
    }

    pub fn get_forward_string(&self) -> String {
        String::from_utf8_lossy(&self.seq).to_string()
    }

    pub fn reverse_complement(&self) -> RNAstring {
        self.seq
            .iter()
            .rev()
            .map(|c| IupacCode::letter_complement(*c))
            .collect()
    }

    /// Human-readable handle for diagnostics.
    pub fn display_id(&self) -> String {
        match &self.name {
            Some(name) => name.to_owned(),
            None => "*".to_string(),
        }
    }

    /// Same handle, capped for one-line size-limit messages. Truncation
    /// counts characters, not bytes, so multibyte ids stay intact.
    pub fn truncated_id(&self) -> String {
        let id = self.display_id();
        if id.chars().count() > ID_DISPLAY_MAX {
            id.chars().take(ID_DISPLAY_MAX - 1).collect()
        } else {
            id
        }
    }
}

impl fmt::Display for RnaSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.seq))
    }
}

impl From<String> for RnaSequence {
    fn from(s: String) -> Self {
        RnaSequence::from_u8(s.as_bytes())
    }
}
