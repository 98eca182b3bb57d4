//! Fold gateway: wraps an external RNAfold-style executable behind an
//! explicit outcome type, isolating failures to the sequence being folded.

use std::{
    io::{ErrorKind, Write},
    process::{Command, Stdio},
    sync::Arc,
};

/// Sequences at or above this length are never handed to the folding tool.
pub const SEQUENCE_MAX_SIZE: usize = 4000;

pub const DEFAULT_TEMPERATURE: i32 = 37;

const DEFAULT_RNAFOLD_BIN: &str = "RNAfold";
const RNAFOLD_ENV_BIN: &str = "LOOPMATCH_RNAFOLD_BIN";

#[derive(Debug, Clone, PartialEq)]
pub struct FoldPrediction {
    pub structure: String,
    pub mfe: Option<f64>,
}

/// Every way a fold request can end. There is deliberately no null state:
/// a structure value exists if and only if the fold succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum FoldOutcome {
    Folded(FoldPrediction),
    SizeExceeded { length: usize, limit: usize },
    Failed { message: Option<String> },
}

impl FoldOutcome {
    pub fn is_folded(&self) -> bool {
        matches!(self, Self::Folded(_))
    }

    fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: Some(message.into()),
        }
    }
}

/// The external folding computation. Production code uses [`RnaFold`];
/// tests substitute their own engines.
pub trait FoldEngine: Send + Sync {
    fn fold(&self, sequence: &str, temperature: i32, avoid_lonely_pairs: bool) -> FoldOutcome;
}

fn rnafold_executable() -> String {
    std::env::var(RNAFOLD_ENV_BIN)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_RNAFOLD_BIN.to_string())
}

/// Subprocess engine: feeds the sequence on stdin and reads the dot-bracket
/// plus minimum free energy from stdout.
#[derive(Debug, Default)]
pub struct RnaFold;

impl FoldEngine for RnaFold {
    fn fold(&self, sequence: &str, temperature: i32, avoid_lonely_pairs: bool) -> FoldOutcome {
        let executable = rnafold_executable();
        let mut args = vec!["--noPS".to_string(), format!("--temp={temperature}")];
        if avoid_lonely_pairs {
            args.push("--noLP".to_string());
        }

        let mut child = match Command::new(&executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return FoldOutcome::failed(format!(
                    "Could not find folding executable '{executable}'. \
                     Install ViennaRNA or set {RNAFOLD_ENV_BIN}"
                ));
            }
            Err(e) => {
                return FoldOutcome::failed(format!(
                    "Could not run folding executable '{executable}': {e}"
                ));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin
                .write_all(sequence.as_bytes())
                .and_then(|()| stdin.write_all(b"\n"))
            {
                // the child never saw its input; reap it so no zombie lingers
                let _ = child.kill();
                let _ = child.wait();
                return FoldOutcome::failed(format!("Could not pass sequence to fold: {e}"));
            }
            // stdin drops here so the tool sees end of input
        }

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => return FoldOutcome::failed(format!("Fold did not finish: {e}")),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr.trim().to_string())
            };
            return FoldOutcome::Failed { message };
        }

        // The tool can exit 0 and still report a hard error on stderr;
        // treat that exactly like a failed run.
        if stderr.contains("ERROR") {
            return FoldOutcome::failed(stderr.trim().to_string());
        }

        match parse_fold_stdout(&stdout, sequence.len()) {
            Some(prediction) => FoldOutcome::Folded(prediction),
            None => FoldOutcome::failed(format!(
                "Fold produced no usable structure (stdout: '{}')",
                stdout.trim()
            )),
        }
    }
}

/// RNAfold echoes the sequence, then prints `<dot-bracket> (<mfe>)`.
fn parse_fold_stdout(stdout: &str, sequence_len: usize) -> Option<FoldPrediction> {
    for line in stdout.lines() {
        let line = line.trim_start();
        let token = match line.split_whitespace().next() {
            Some(t) => t,
            None => continue,
        };
        if token.len() != sequence_len || !token.chars().all(|c| matches!(c, '(' | ')' | '.')) {
            continue;
        }
        let rest = line[token.len()..].trim();
        let mfe = rest
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim()
            .parse::<f64>()
            .ok();
        return Some(FoldPrediction {
            structure: token.to_string(),
            mfe,
        });
    }
    None
}

/// Size gate plus engine call. The length precondition is checked here so
/// oversized sequences never spawn the external tool.
pub struct FoldGateway {
    engine: Arc<dyn FoldEngine>,
    limit: usize,
}

impl FoldGateway {
    pub fn new(engine: Arc<dyn FoldEngine>) -> Self {
        Self {
            engine,
            limit: SEQUENCE_MAX_SIZE,
        }
    }

    pub fn with_limit(engine: Arc<dyn FoldEngine>, limit: usize) -> Self {
        Self { engine, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn predict(
        &self,
        sequence: &str,
        temperature: i32,
        avoid_lonely_pairs: bool,
    ) -> FoldOutcome {
        if sequence.len() >= self.limit {
            return FoldOutcome::SizeExceeded {
                length: sequence.len(),
                limit: self.limit,
            };
        }
        self.engine.fold(sequence, temperature, avoid_lonely_pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl FoldEngine for CountingEngine {
        fn fold(&self, sequence: &str, _: i32, _: bool) -> FoldOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FoldOutcome::Folded(FoldPrediction {
                structure: ".".repeat(sequence.len()),
                mfe: Some(0.0),
            })
        }
    }

    #[test]
    fn test_parse_fold_stdout() {
        let stdout = "GGGAAAACCC\n(((....))) ( -3.40)\n";
        let p = parse_fold_stdout(stdout, 10).unwrap();
        assert_eq!(p.structure, "(((....)))");
        assert_eq!(p.mfe, Some(-3.4));
    }

    #[test]
    fn test_parse_fold_stdout_no_structure() {
        assert!(parse_fold_stdout("GGGAAAACCC\n", 10).is_none());
        // all-unpaired output is ambiguous with the sequence echo line,
        // so the echo (letters) must be skipped and the dots accepted
        let p = parse_fold_stdout("AAAA\n.... (  0.00)\n", 4).unwrap();
        assert_eq!(p.structure, "....");
    }

    #[test]
    fn test_size_precondition() {
        let engine = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let gateway = FoldGateway::with_limit(engine.clone(), 10);

        let outcome = gateway.predict("AAAAAAAAAA", DEFAULT_TEMPERATURE, false);
        assert_eq!(
            outcome,
            FoldOutcome::SizeExceeded {
                length: 10,
                limit: 10
            }
        );
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);

        let outcome = gateway.predict("AAAAAAAAA", DEFAULT_TEMPERATURE, false);
        assert!(outcome.is_folded());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_write_failure_reaps_child() {
        use std::os::unix::fs::PermissionsExt;

        // an executable that closes its stdin and then lingers; writing a
        // buffer larger than the pipe capacity is guaranteed to fail
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("close_stdin.sh");
        std::fs::write(&script, "#!/bin/sh\nexec 0<&-\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        unsafe { std::env::set_var(RNAFOLD_ENV_BIN, &script) };
        let sequence = "A".repeat(1 << 20);
        let outcome = RnaFold.fold(&sequence, DEFAULT_TEMPERATURE, false);
        unsafe { std::env::remove_var(RNAFOLD_ENV_BIN) };

        // returning promptly means the lingering child was killed and reaped
        match outcome {
            FoldOutcome::Failed { message: Some(m) } => {
                assert!(m.starts_with("Could not pass sequence to fold"), "{m}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_default_limit() {
        let engine = Arc::new(CountingEngine {
            calls: AtomicUsize::new(0),
        });
        let gateway = FoldGateway::new(engine);
        assert_eq!(gateway.limit(), SEQUENCE_MAX_SIZE);
    }
}
