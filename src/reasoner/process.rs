//! Classifier running as a child process.
//!
//! The exported N-Triples are written to the child's stdin; the child prints
//! a JSON [`ReasonerOutput`] on stdout. Every pipe is served by its own helper
//! thread. Output is received with a deadline; on expiry the child is killed.
//! Helpers are joined before `classify` returns, unless a descendant of the
//! child still holds a pipe open past a short grace period.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::config::ReasonerConfig;
use crate::error::ReasonerError;

use super::{Classifier, ReasonerInput, ReasonerOutput};

/// How long helper threads get to finish once the child is gone.
const JOIN_GRACE: Duration = Duration::from_millis(250);
/// Longest deadline handed to the output channel.
const MAX_WAIT: Duration = Duration::from_secs(7 * 24 * 3600);

/// Runs an external classifier program.
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessClassifier {
    /// A classifier running `program` with `args`, killed after `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// The configured classifier, or `None` when no program is set.
    #[must_use]
    pub fn from_config(config: &ReasonerConfig) -> Option<Self> {
        config.is_configured().then(|| {
            Self::new(
                config.program.trim(),
                config.args.clone(),
                Duration::from_millis(config.timeout_ms),
            )
        })
    }

    /// Deadline for one classification run.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn spawn(&self) -> Result<Child, ReasonerError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ReasonerError::Spawn {
                program: self.program.clone(),
                message: err.to_string(),
            })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

fn read_all(mut source: impl Read) -> io::Result<String> {
    let mut buf = String::new();
    source.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Pipe helper threads of one run. Each reports its name on `done` when it exits.
struct Helpers {
    done_tx: Sender<&'static str>,
    done_rx: Receiver<&'static str>,
    finished: Vec<&'static str>,
    running: Vec<(&'static str, JoinHandle<io::Result<String>>)>,
}

impl Helpers {
    fn new() -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            done_tx,
            done_rx,
            finished: Vec::new(),
            running: Vec::new(),
        }
    }

    fn spawn(&mut self, name: &'static str, work: impl FnOnce() -> io::Result<String> + Send + 'static) {
        let done = self.done_tx.clone();
        let handle = thread::spawn(move || {
            let result = work();
            let _ = done.send(name);
            result
        });
        self.running.push((name, handle));
    }

    /// Waits until `name` exits or `deadline` passes; joins it if it exited.
    fn join(&mut self, name: &'static str, deadline: Instant) -> Option<io::Result<String>> {
        while !self.finished.contains(&name) {
            match self.done_rx.recv_deadline(deadline) {
                Ok(exited) => self.finished.push(exited),
                Err(_) => return None,
            }
        }
        let index = self.running.iter().position(|(n, _)| *n == name)?;
        let (_, handle) = self.running.swap_remove(index);
        Some(handle.join().unwrap_or_else(|_| {
            Err(io::Error::new(io::ErrorKind::Other, "pipe helper panicked"))
        }))
    }

    /// Joins every remaining helper that exits before `deadline`.
    ///
    /// Returns how many were left running because their pipe is still held
    /// open by a descendant of the child.
    fn finish(mut self, deadline: Instant) -> usize {
        let names: Vec<&'static str> = self.running.iter().map(|(n, _)| *n).collect();
        let mut detached = 0;
        for name in names {
            match self.join(name, deadline) {
                Some(Err(err)) => debug!(helper = name, error = %err, "classifier pipe closed early"),
                Some(Ok(_)) => {}
                None => {
                    warn!(helper = name, "classifier pipe still held open, helper left running");
                    detached += 1;
                }
            }
        }
        detached
    }
}

impl Classifier for ProcessClassifier {
    fn classify(&self, input: &ReasonerInput) -> Result<ReasonerOutput, ReasonerError> {
        let deadline = Instant::now() + self.timeout.min(MAX_WAIT);
        let mut child = self.spawn()?;
        debug!(program = %self.program, pid = child.id(), "spawned classifier");

        // stdin is fed from its own thread so a child that writes before
        // draining its input cannot block on a full pipe.
        let mut helpers = Helpers::new();
        if let Some(mut stdin) = child.stdin.take() {
            let payload = input.ntriples.clone();
            helpers.spawn("stdin", move || stdin.write_all(payload.as_bytes()).map(|()| String::new()));
        }
        if let Some(stdout) = child.stdout.take() {
            helpers.spawn("stdout", move || read_all(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            helpers.spawn("stderr", move || read_all(stderr));
        }

        let Some(stdout) = helpers.join("stdout", deadline) else {
            warn!(program = %self.program, timeout_ms = self.timeout_ms(), "classifier timed out");
            if let Err(err) = child.kill() {
                debug!(error = %err, "classifier already exited");
            }
            if let Err(err) = child.wait() {
                debug!(error = %err, "cannot reap classifier");
            }
            helpers.finish(Instant::now() + JOIN_GRACE);
            return Err(ReasonerError::TimedOut {
                timeout_ms: self.timeout_ms(),
            });
        };
        let stdout = stdout.map_err(|err| ReasonerError::MalformedOutput {
            reason: format!("cannot read classifier output: {err}"),
        });

        let status = child.wait().map_err(|err| ReasonerError::Spawn {
            program: self.program.clone(),
            message: err.to_string(),
        });
        let stderr = helpers
            .join("stderr", Instant::now() + JOIN_GRACE)
            .and_then(Result::ok)
            .unwrap_or_default();
        helpers.finish(Instant::now() + JOIN_GRACE);

        let status = status?;
        if !status.success() {
            return Err(ReasonerError::ExitStatus {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        ReasonerOutput::from_json(&stdout?)
    }
}
