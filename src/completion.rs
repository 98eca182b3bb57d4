//! Completion barrier: many tasks count down, one dispatcher waits.

use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: Mutex<usize>,
    done: Condvar,
}

impl CompletionBarrier {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.done.notify_all();
        }
    }

    /// Blocks until every task has counted down.
    pub fn wait(&self) {
        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while *remaining > 0 {
            remaining = self
                .done
                .wait(remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn remaining(&self) -> usize {
        *self
            .remaining
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Counts its barrier down exactly once, when dropped. Giving one of these
/// to each task makes the decrement unconditional: it happens on normal
/// exit, on early aborts, and while unwinding from a panic.
#[derive(Debug)]
pub struct CompletionGuard {
    barrier: Arc<CompletionBarrier>,
}

impl CompletionGuard {
    pub fn new(barrier: Arc<CompletionBarrier>) -> Self {
        Self { barrier }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.barrier.count_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_count_down() {
        let barrier = CompletionBarrier::new(2);
        assert_eq!(barrier.remaining(), 2);
        barrier.count_down();
        assert_eq!(barrier.remaining(), 1);
        barrier.count_down();
        assert_eq!(barrier.remaining(), 0);
        // saturates instead of wrapping
        barrier.count_down();
        assert_eq!(barrier.remaining(), 0);
        barrier.wait();
    }

    #[test]
    fn test_guard_decrements_on_drop() {
        let barrier = Arc::new(CompletionBarrier::new(1));
        {
            let _guard = CompletionGuard::new(barrier.clone());
            assert_eq!(barrier.remaining(), 1);
        }
        assert_eq!(barrier.remaining(), 0);
    }

    #[test]
    fn test_guard_decrements_on_panic() {
        let barrier = Arc::new(CompletionBarrier::new(1));
        let inner = barrier.clone();
        let result = thread::spawn(move || {
            let _guard = CompletionGuard::new(inner);
            panic!("task blew up");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(barrier.remaining(), 0);
    }

    #[test]
    fn test_wait_blocks_for_stragglers() {
        let barrier = Arc::new(CompletionBarrier::new(3));
        let mut workers = vec![];
        for _ in 0..3 {
            let inner = barrier.clone();
            workers.push(thread::spawn(move || {
                let _guard = CompletionGuard::new(inner);
            }));
        }
        barrier.wait();
        assert_eq!(barrier.remaining(), 0);
        for w in workers {
            w.join().unwrap();
        }
    }
}
