//! Result sink: append-only row writer shared by all concurrently running
//! tasks. Appends are serialized through an internal lock, so any task can
//! write at any time; the dispatcher owns the sink and flushes it once after
//! the whole batch has finished.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::Write,
    path::Path,
    sync::Mutex,
};

/// One match found by a pass. Loop fields are filled for structure-aware
/// passes and left empty for plain sequence scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopRow {
    pub sequence_id: String,
    pub pattern: String,
    pub strand: char,
    pub position: usize,
    pub loop_start: Option<usize>,
    pub loop_len: Option<usize>,
    pub loop_seq: Option<String>,
    pub structure: Option<String>,
}

#[derive(Debug)]
pub enum SinkError {
    Csv(String),
    Poisoned,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(e) => write!(f, "CSV error: {e}"),
            Self::Poisoned => write!(f, "result sink lock was poisoned"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<csv::Error> for SinkError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

pub trait ResultSink: Send + Sync {
    fn append(&self, row: LoopRow) -> Result<(), SinkError>;
    fn flush(&self) -> Result<(), SinkError>;
}

pub struct CsvSink<W: Write + Send> {
    writer: Mutex<csv::Writer<W>>,
}

impl CsvSink<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        Ok(Self {
            writer: Mutex::new(csv::Writer::from_path(path)?),
        })
    }
}

impl<W: Write + Send> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(csv::Writer::from_writer(writer)),
        }
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn append(&self, row: LoopRow) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.serialize(row)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.flush().map_err(|e| SinkError::Csv(e.to_string()))
    }
}

/// In-memory sink, mainly for tests and the machine-readable CLI summary.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<LoopRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<LoopRow> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn append(&self, row: LoopRow) -> Result<(), SinkError> {
        self.rows
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(row);
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> LoopRow {
        LoopRow {
            sequence_id: "hp1".to_string(),
            pattern: "AUG".to_string(),
            strand: '+',
            position: 3,
            loop_start: Some(3),
            loop_len: Some(4),
            loop_seq: Some("AUGA".to_string()),
            structure: Some("(((....)))".to_string()),
        }
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.append(sample_row()).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.rows()[0].pattern, "AUG");
    }

    #[test]
    fn test_csv_sink_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::from_path(&path).unwrap();
        sink.append(sample_row()).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "sequence_id,pattern,strand,position,loop_start,loop_len,loop_seq,structure"
        );
        assert_eq!(lines.next().unwrap(), "hp1,AUG,+,3,3,4,AUGA,(((....)))");
    }

    #[test]
    fn test_csv_sink_concurrent_append() {
        let sink = std::sync::Arc::new(CsvSink::from_writer(Vec::new()));
        let mut workers = vec![];
        for _ in 0..4 {
            let sink = sink.clone();
            workers.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    sink.append(sample_row()).unwrap();
                }
            }));
        }
        for w in workers {
            w.join().unwrap();
        }
        sink.flush().unwrap();
    }
}
