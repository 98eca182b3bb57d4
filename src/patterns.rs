//! Pattern cursor: a single-pass, non-restartable source of candidate motif
//! strings. Items are fallible so one malformed line can be logged and
//! skipped without ending the task's matching loop.

use crate::error::LoopmatchError;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
};

pub struct PatternSource {
    inner: Box<dyn Iterator<Item = io::Result<String>> + Send>,
}

impl std::fmt::Debug for PatternSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternSource").finish_non_exhaustive()
    }
}

impl PatternSource {
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: Iterator<Item = io::Result<String>> + Send + 'static,
    {
        Self {
            inner: Box::new(iter),
        }
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self::from_iter(reader.lines())
    }

    pub fn from_file(filename: &str) -> Result<Self, LoopmatchError> {
        let file = File::open(filename)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_vec(patterns: Vec<String>) -> Self {
        Self::from_iter(patterns.into_iter().map(Ok))
    }

    pub fn from_slice(patterns: &[&str]) -> Self {
        Self::from_vec(patterns.iter().map(|p| p.to_string()).collect())
    }
}

impl Iterator for PatternSource {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(line) => {
                    let pattern = line.trim().to_uppercase();
                    if pattern.is_empty() {
                        continue;
                    }
                    return Some(Ok(pattern));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let patterns: Vec<_> = PatternSource::from_slice(&[" aug ", "", "  ", "gcu"])
            .map(|p| p.unwrap())
            .collect();
        assert_eq!(patterns, vec!["AUG", "GCU"]);
    }

    #[test]
    fn test_error_items_pass_through() {
        let items = vec![
            Ok("aug".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad line")),
            Ok("gcu".to_string()),
        ];
        let mut source = PatternSource::from_iter(items.into_iter());
        assert_eq!(source.next().unwrap().unwrap(), "AUG");
        assert!(source.next().unwrap().is_err());
        assert_eq!(source.next().unwrap().unwrap(), "GCU");
        assert!(source.next().is_none());
    }

    #[test]
    fn test_from_file() {
        let patterns: Vec<_> = PatternSource::from_file("test_files/patterns.txt")
            .unwrap()
            .map(|p| p.unwrap())
            .collect();
        assert!(!patterns.is_empty());
        assert!(patterns.iter().all(|p| p == &p.to_uppercase()));
    }
}
