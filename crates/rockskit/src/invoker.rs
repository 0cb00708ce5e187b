//! Asynchronous subprocess invocation.
//!
//! The invoker runs the package-manager binary on a worker thread and
//! hands back a one-shot [`Invocation`] handle. The handle's `wait`
//! consumes it, so a result can be read at most once; the producer
//! side sends exactly one terminal value, even when the binary cannot
//! be spawned at all.

use std::process::Command;
use std::sync::mpsc;
use std::thread;

/// Synthetic exit code used when the binary cannot be spawned.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Captured output of a finished subprocess, passed through verbatim.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; [`SPAWN_FAILURE_CODE`] if the process never started
    pub code: i32,
    /// Raw stdout
    pub stdout: String,
    /// Raw stderr, or the spawn diagnostic if the process never started
    pub stderr: String,
    /// True when the process never started; `stderr` then holds the
    /// spawn diagnostic rather than anything the tool wrote
    pub spawn_failed: bool,
}

impl ProcessOutput {
    /// Whether the process exited successfully.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs a fixed binary with per-call argument lists.
#[derive(Debug, Clone)]
pub struct Invoker {
    program: String,
}

impl Invoker {
    /// Create an invoker for the given binary.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The binary this invoker runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the binary with `args` without blocking the caller.
    ///
    /// The returned handle resolves once, when the process exits.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Invocation {
        let (tx, rx) = mpsc::sync_channel(1);
        let program = self.program.clone();
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        let worker = thread::spawn(move || {
            let output = execute(&program, &args);
            // Receiver may have been dropped; nothing to do then.
            let _ = tx.send(output);
        });

        Invocation { rx, worker }
    }

    /// Spawn the binary and fire `on_complete` exactly once when it
    /// exits, on the worker thread. Returns a handle the caller can
    /// still block on until the callback has run.
    pub fn run_with<S, F>(&self, args: &[S], on_complete: F) -> thread::JoinHandle<()>
    where
        S: AsRef<str>,
        F: FnOnce(ProcessOutput) + Send + 'static,
    {
        let program = self.program.clone();
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        thread::spawn(move || {
            let output = execute(&program, &args);
            on_complete(output);
        })
    }
}

/// One-shot handle to a running subprocess.
///
/// Consuming `wait` is the only way to read the result, which rules
/// out double consumption by construction.
#[derive(Debug)]
pub struct Invocation {
    rx: mpsc::Receiver<ProcessOutput>,
    worker: thread::JoinHandle<()>,
}

impl Invocation {
    /// Block until the process exits and return its output.
    pub fn wait(self) -> ProcessOutput {
        let output = match self.rx.recv() {
            Ok(output) => output,
            // Worker thread panicked before sending; synthesize a
            // terminal value so the caller still gets exactly one.
            Err(_) => ProcessOutput {
                code: SPAWN_FAILURE_CODE,
                stdout: String::new(),
                stderr: "subprocess worker terminated without a result".to_string(),
                spawn_failed: true,
            },
        };
        let _ = self.worker.join();
        output
    }
}

fn execute(program: &str, args: &[String]) -> ProcessOutput {
    log::debug!("running {} {}", program, args.join(" "));

    match Command::new(program).args(args).output() {
        Ok(output) => ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            spawn_failed: false,
        },
        Err(e) => ProcessOutput {
            code: SPAWN_FAILURE_CODE,
            stdout: String::new(),
            stderr: format!("failed to spawn {program}: {e}"),
            spawn_failed: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_run_captures_stdout() {
        let invoker = Invoker::new("sh");
        let output = invoker.run(&["-c", "echo hello"]).wait();
        assert_eq!(output.code, 0);
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_run_captures_exit_code_and_stderr() {
        let invoker = Invoker::new("sh");
        let output = invoker.run(&["-c", "echo oops >&2; exit 3"]).wait();
        assert_eq!(output.code, 3);
        assert!(!output.success());
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_spawn_failure_is_synthesized() {
        let invoker = Invoker::new("definitely-not-a-real-binary-rocksync");
        let output = invoker.run(&["--version"]).wait();
        assert_eq!(output.code, SPAWN_FAILURE_CODE);
        assert!(output.spawn_failed);
        assert!(output.stderr.contains("failed to spawn"));
    }

    #[test]
    fn test_exit_127_is_not_a_spawn_failure() {
        // A process that ran and exited 127 with a look-alike message
        // must not be classified as a spawn failure.
        let invoker = Invoker::new("sh");
        let output = invoker
            .run(&["-c", "echo 'failed to spawn something' >&2; exit 127"])
            .wait();
        assert_eq!(output.code, 127);
        assert!(!output.spawn_failed);
    }

    #[test]
    fn test_callback_fires_exactly_once() {
        let invoker = Invoker::new("sh");
        let (tx, rx) = mpsc::channel();
        let handle = invoker.run_with(&["-c", "exit 0"], move |output| {
            tx.send(output.code).unwrap();
        });
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), 0);
        // Sender was moved into the FnOnce; a second fire is impossible
        // and the channel is now closed.
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_callback_fires_on_spawn_failure() {
        let invoker = Invoker::new("definitely-not-a-real-binary-rocksync");
        let (tx, rx) = mpsc::channel();
        let handle = invoker.run_with(&["x"], move |output| {
            tx.send(output.code).unwrap();
        });
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), SPAWN_FAILURE_CODE);
    }
}
