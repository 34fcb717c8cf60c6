//! Single-command execution with timeout and output capture.
//!
//! Exit-code convention:
//! - normal termination: the process's own code
//! - timeout: 124 (`timed_out = true`)
//! - executable not found: 127
//! - any other spawn failure: 1
//!
//! Failures are encoded in the returned [`ExecutionResult`], never raised.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

/// Exit code recorded when the wall-clock timeout fires
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code recorded when the executable cannot be found
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code recorded for any other failure to start the process
pub const EXIT_SPAWN_FAILED: i32 = 1;

/// Stored previews are truncated to this many characters
pub const PREVIEW_LIMIT: usize = 2000;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything needed to run one command
#[derive(Debug, Clone)]
pub struct ExecRequest
{
    pub cmd: String,
    pub cwd: PathBuf,
    /// Complete child environment (already merged)
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
}

/// Outcome of one command
#[derive(Debug, Clone)]
pub struct ExecutionResult
{
    pub exit_code: i32,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult
{
    pub fn success(&self) -> bool
    {
        self.exit_code == 0
    }

    pub fn stdout_preview(&self) -> String
    {
        preview(&self.stdout)
    }

    pub fn stderr_preview(&self) -> String
    {
        preview(&self.stderr)
    }

    fn not_started(
        exit_code: i32,
        message: String,
        at: DateTime<Utc>,
    ) -> Self
    {
        Self {
            exit_code,
            timed_out: false,
            stdout: String::new(),
            stderr: message,
            start: at,
            end: at,
            duration_ms: 0,
        }
    }
}

/// First [`PREVIEW_LIMIT`] characters of `text`
pub fn preview(text: &str) -> String
{
    text.chars()
        .take(PREVIEW_LIMIT)
        .collect()
}

/// Build a fresh child environment: `base`, then `env_file` entries, then
/// explicit `overrides`. Later layers win.
pub fn merge_env<'a>(
    base: impl IntoIterator<Item = (String, String)>,
    env_file: impl IntoIterator<Item = &'a (String, String)>,
    overrides: impl IntoIterator<Item = &'a (String, String)>,
) -> BTreeMap<String, String>
{
    let mut env: BTreeMap<String, String> = base
        .into_iter()
        .collect();
    for (k, v) in env_file
        .into_iter()
        .chain(overrides)
    {
        env.insert(k.clone(), v.clone());
    }
    env
}

/// Run one command to completion or timeout.
#[instrument(skip(req), fields(cmd = %req.cmd))]
pub fn execute(req: &ExecRequest) -> ExecutionResult
{
    let started_at = Utc::now();

    let argv = match shell_words::split(&req.cmd)
    {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) =>
        {
            return ExecutionResult::not_started(
                EXIT_SPAWN_FAILED,
                "empty command".to_string(),
                started_at,
            );
        }
        Err(e) =>
        {
            return ExecutionResult::not_started(
                EXIT_SPAWN_FAILED,
                format!("cannot parse command: {e}"),
                started_at,
            );
        }
    };

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .current_dir(&req.cwd)
        .env_clear()
        .envs(&req.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate_process_group(&mut command);

    let clock = Instant::now();
    let mut child = match command.spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound && !req.cwd.is_dir() =>
        {
            warn!(cwd = %req.cwd.display(), "working directory missing");
            return ExecutionResult::not_started(
                EXIT_SPAWN_FAILED,
                format!("working directory {} does not exist", req.cwd.display()),
                started_at,
            );
        }
        Err(e) if e.kind() == ErrorKind::NotFound =>
        {
            debug!(program = %argv[0], "executable not found");
            return ExecutionResult::not_started(
                EXIT_NOT_FOUND,
                format!("command not found: {}", argv[0]),
                started_at,
            );
        }
        Err(e) =>
        {
            warn!(program = %argv[0], "spawn failed: {e}");
            return ExecutionResult::not_started(
                EXIT_SPAWN_FAILED,
                format!("failed to start {}: {e}", argv[0]),
                started_at,
            );
        }
    };

    let stdout_reader = drain(
        child
            .stdout
            .take(),
    );
    let stderr_reader = drain(
        child
            .stderr
            .take(),
    );

    let (status, timed_out) = wait_with_deadline(&mut child, req.timeout);

    let stdout = join_reader(stdout_reader);
    let mut stderr = join_reader(stderr_reader);

    let duration_ms = clock
        .elapsed()
        .as_millis() as u64;
    let ended_at = Utc::now();

    let exit_code = if timed_out
    {
        if !stderr.is_empty() && !stderr.ends_with('\n')
        {
            stderr.push('\n');
        }
        stderr.push_str(&format!(
            "command timed out after {}s",
            req.timeout
                .as_secs()
        ));
        EXIT_TIMEOUT
    }
    else
    {
        status
            .map(exit_code_of)
            .unwrap_or(EXIT_SPAWN_FAILED)
    };

    debug!(exit_code, timed_out, duration_ms, "command finished");

    ExecutionResult {
        exit_code,
        timed_out,
        stdout,
        stderr,
        start: started_at,
        end: ended_at,
        duration_ms,
    }
}

/// Poll until the child exits or `timeout` elapses; kill it on timeout.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> (Option<ExitStatus>, bool)
{
    let deadline = Instant::now() + timeout;
    loop
    {
        match child.try_wait()
        {
            Ok(Some(status)) => return (Some(status), false),
            Ok(None) => {}
            Err(e) =>
            {
                warn!("failed to poll child: {e}");
                kill_tree(child);
                return (child.wait().ok(), false);
            }
        }

        if Instant::now() >= deadline
        {
            kill_tree(child);
            let _ = child.wait();
            return (None, true);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String
{
    handle
        .and_then(|h| {
            h.join()
                .ok()
        })
        .map(|bytes| {
            String::from_utf8_lossy(&bytes).into_owned()
        })
        .unwrap_or_default()
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32
{
    use std::os::unix::process::ExitStatusExt;

    // Shell convention for signal deaths
    status
        .code()
        .or_else(|| {
            status
                .signal()
                .map(|s| 128 + s)
        })
        .unwrap_or(EXIT_SPAWN_FAILED)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32
{
    status
        .code()
        .unwrap_or(EXIT_SPAWN_FAILED)
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command)
{
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_tree(child: &mut Child)
{
    let pid = child.id() as libc::pid_t;
    // Child leads its own group, so the negative pid reaches grandchildren too
    // SAFETY: plain kill(2) on a group we created
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0
    {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child)
{
    let _ = child.kill();
}
