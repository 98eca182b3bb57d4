//! Admission gate for fold-dependent matching: a counting permit pool that
//! caps how many expensive structure passes run at once. Plain-sequence and
//! pre-supplied-structure matching never goes through here.

use crate::TRANSLATIONS;
use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, OnceLock},
};

/// A failed permit wait. Skippable: the caller abandons the current pass and
/// moves on; the task itself keeps running.
#[derive(Debug, Clone, PartialEq)]
pub enum GateError {
    Poisoned,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poisoned => write!(f, "permit wait abandoned: gate lock was poisoned"),
        }
    }
}

impl std::error::Error for GateError {}

#[derive(Debug)]
pub struct FoldGate {
    permits: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

/// RAII permit: dropping it returns the permit, also during unwinding.
pub struct FoldPermit<'a> {
    gate: &'a FoldGate,
}

impl FoldGate {
    pub fn new(permits: usize) -> Self {
        Self {
            permits,
            available: Mutex::new(permits),
            freed: Condvar::new(),
        }
    }

    /// Permit pool sized for the machine: two permits per core plus one.
    pub fn for_cores(cores: usize) -> Self {
        Self::new(2 * cores + 1)
    }

    /// The one process-wide gate. The first caller fixes the size; later
    /// calls return the already-built gate regardless of their argument.
    pub fn shared(cores: usize) -> Arc<FoldGate> {
        static GATE: OnceLock<Arc<FoldGate>> = OnceLock::new();
        GATE.get_or_init(|| {
            let gate = FoldGate::for_cores(cores);
            eprintln!("{} {}", TRANSLATIONS.get("using_n_cores"), gate.permits());
            Arc::new(gate)
        })
        .clone()
    }

    /// Blocks until a permit is free.
    pub fn acquire(&self) -> Result<FoldPermit<'_>, GateError> {
        let mut available = self.available.lock().map_err(|_| GateError::Poisoned)?;
        while *available == 0 {
            available = self
                .freed
                .wait(available)
                .map_err(|_| GateError::Poisoned)?;
        }
        *available -= 1;
        Ok(FoldPermit { gate: self })
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    pub fn available(&self) -> usize {
        *self
            .available
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self) {
        let mut available = self
            .available
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *available += 1;
        self.freed.notify_one();
    }
}

impl Drop for FoldPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
