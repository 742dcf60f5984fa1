//! Child process execution with timeouts and bounded output.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Bytes of stdout/stderr kept per stream; the rest is drained and discarded.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Result of one bounded execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Exited {
        /// `None` when the child was terminated by a signal.
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The child outlived the timeout. It is left running and detached.
    TimedOut,
}

/// Abstraction over process execution so the correction loop can be scripted in tests.
pub trait ProcessRunner {
    /// Run `command` in `workdir`, waiting at most `timeout`.
    ///
    /// Errors are reserved for failures to start the process at all.
    fn run(&self, command: &[String], workdir: &Path, timeout: Duration) -> Result<RunOutcome>;
}

/// Runs real child processes.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    output_limit_bytes: usize,
}

impl CommandRunner {
    pub fn new(output_limit_bytes: usize) -> Self {
        Self { output_limit_bytes }
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

impl ProcessRunner for CommandRunner {
    fn run(&self, command: &[String], workdir: &Path, timeout: Duration) -> Result<RunOutcome> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("command must be non-empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(workdir);
        run_command_with_timeout(cmd, timeout, self.output_limit_bytes)
            .with_context(|| format!("run {}", command.join(" ")))
    }
}

/// Grace period for draining pipes after the child exits close to the deadline.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Bytes kept from one stream plus the count of bytes discarded past the limit.
#[derive(Debug, Default)]
struct Captured {
    kept: Vec<u8>,
    truncated: usize,
}

type SharedCapture = Arc<Mutex<Captured>>;

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. The timeout bounds the whole
/// call, including draining the pipes: a grandchild that inherits them and keeps
/// them open does not extend it. When the child itself is still running at the
/// deadline it is not killed: the handle and its reader threads are dropped,
/// leaving the process running on its own.
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64, output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<RunOutcome> {
    let deadline = Instant::now() + timeout;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (done_tx, done_rx) = mpsc::channel();
    let stdout_capture = spawn_reader(stdout, output_limit_bytes, done_tx.clone());
    let stderr_capture = spawn_reader(stderr, output_limit_bytes, done_tx);

    let Some(status) = child.wait_timeout(timeout).context("wait for command")? else {
        warn!(
            timeout_ms = timeout.as_millis() as u64,
            pid = child.id(),
            "command still running at timeout, detaching"
        );
        return Ok(RunOutcome::TimedOut);
    };

    wait_for_readers(&done_rx, deadline)?;
    let stdout = take_capture(&stdout_capture)?;
    let stderr = take_capture(&stderr_capture)?;

    if stdout.truncated > 0 || stderr.truncated > 0 {
        warn!(
            stdout_truncated = stdout.truncated,
            stderr_truncated = stderr.truncated,
            "output truncated"
        );
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(RunOutcome::Exited {
        code: status.code(),
        stdout: String::from_utf8_lossy(&stdout.kept).into_owned(),
        stderr: String::from_utf8_lossy(&stderr.kept).into_owned(),
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    limit: usize,
    done: mpsc::Sender<Result<()>>,
) -> SharedCapture {
    let capture = SharedCapture::default();
    let shared = Arc::clone(&capture);
    thread::spawn(move || {
        let result = read_stream_limited(reader, limit, &shared);
        if done.send(result).is_err() {
            debug!("output reader finished after the run returned");
        }
    });
    capture
}

/// Wait until both readers hit EOF, or until the deadline passes.
///
/// On expiry the readers are left detached and the output captured so far is used.
fn wait_for_readers(done: &mpsc::Receiver<Result<()>>, deadline: Instant) -> Result<()> {
    for _ in 0..2 {
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(OUTPUT_DRAIN_GRACE);
        match done.recv_timeout(remaining) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                warn!("output pipes still open after exit, keeping captured output");
                return Ok(());
            }
            Err(RecvTimeoutError::Disconnected) => bail!("output reader thread panicked"),
        }
    }
    Ok(())
}

fn take_capture(capture: &SharedCapture) -> Result<Captured> {
    let mut guard = capture
        .lock()
        .map_err(|_| anyhow!("output reader thread panicked"))?;
    Ok(std::mem::take(&mut *guard))
}

fn read_stream_limited<R: Read>(
    mut reader: R,
    limit: usize,
    capture: &Mutex<Captured>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = capture
            .lock()
            .map_err(|_| anyhow!("output capture lock poisoned"))?;
        let remaining = limit.saturating_sub(captured.kept.len());
        let keep = n.min(remaining);
        captured.kept.extend_from_slice(&chunk[..keep]);
        captured.truncated += n - keep;
    }
}
