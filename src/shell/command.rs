//! External command execution.
//!
//! Every external tool (package managers, gpg, chezmoi, installer scripts)
//! runs through the [`Commander`] trait so the install flow can be driven by
//! [`RecordingCommander`] in tests.

use crate::error::{stderr_tail, DotstrapError, Result, STDERR_TAIL_LINES};
use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use super::signal;

/// How child process output is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Output discarded, a spinner shows progress.
    Progress,
    /// Output discarded, plain status lines only.
    #[default]
    Plain,
    /// Output streamed to the terminal.
    Passthrough,
}

impl DisplayMode {
    /// Pick the display mode from CLI verbosity and `--progress`.
    pub fn from_flags(verbosity: u8, progress: bool) -> Self {
        if verbosity > 0 {
            Self::Passthrough
        } else if progress {
            Self::Progress
        } else {
            Self::Plain
        }
    }

    /// Whether child output reaches the terminal.
    pub fn streams_output(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "progress" => Ok(Self::Progress),
            "plain" => Ok(Self::Plain),
            "passthrough" => Ok(Self::Passthrough),
            _ => Err(format!("unknown display mode: {}", s)),
        }
    }
}

/// A command to run, without a shell in between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Output handling.
    pub display: DisplayMode,
    /// Kill the process group after this long.
    pub timeout: Option<Duration>,
    /// Capture stdout even when the display mode discards it.
    pub capture: bool,
}

impl CommandSpec {
    /// Create a spec for `program` with `args`.
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the display mode.
    pub fn display(mut self, display: DisplayMode) -> Self {
        self.display = display;
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Capture stdout for parsing.
    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Prepend a privilege escalation program (e.g. `sudo`).
    pub fn prefixed(self, prefix: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: prefix.to_string(),
            args,
            ..self
        }
    }

    /// Command line as shown to users and recorded in tests.
    ///
    /// Arguments containing whitespace are double-quoted.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// Result of running a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,
    /// Captured standard output (empty when not captured).
    pub stdout: String,
    /// Captured standard error (empty when streamed).
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Failed output with an exit code and stderr.
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Whether the command exited with 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a non-zero exit into a [`DotstrapError::PackageManager`].
    pub fn into_checked(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(DotstrapError::PackageManager {
                command: spec.display_line(),
                code: self.exit_code,
                stderr_tail: stderr_tail(&self.stderr, STDERR_TAIL_LINES),
            })
        }
    }
}

/// Runs external commands.
pub trait Commander: Send + Sync {
    /// Run a command to completion.
    ///
    /// A non-zero exit is not an error here; spawn failures, timeouts and
    /// cancellation are.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and fail on non-zero exit.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.run(spec)?.into_checked(spec)
    }
}

/// Commander backed by real child processes.
#[derive(Debug, Default)]
pub struct SystemCommander;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl SystemCommander {
    /// Create a new system commander.
    pub fn new() -> Self {
        Self
    }

    fn spawn(&self, spec: &CommandSpec, foreground: bool) -> Result<Child> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.envs(&spec.env);
        cmd.stdin(Stdio::inherit());

        if spec.capture {
            cmd.stdout(Stdio::piped());
        } else if spec.display.streams_output() {
            cmd.stdout(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null());
        }

        if spec.display.streams_output() {
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stderr(Stdio::piped());
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
            if foreground {
                // SAFETY: only async-signal-safe calls between fork and exec.
                unsafe {
                    cmd.pre_exec(|| {
                        libc::setpgid(0, 0);
                        libc::signal(libc::SIGTTOU, libc::SIG_IGN);
                        libc::tcsetpgrp(libc::STDIN_FILENO, libc::getpgrp());
                        libc::signal(libc::SIGTTOU, libc::SIG_DFL);
                        Ok(())
                    });
                }
            }
        }
        #[cfg(not(unix))]
        let _ = foreground;

        cmd.spawn().map_err(|e| DotstrapError::PackageManager {
            command: spec.display_line(),
            code: None,
            stderr_tail: e.to_string(),
        })
    }

    fn wait(&self, child: &mut Child, spec: &CommandSpec) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if signal::is_cancelled() {
                kill_group(child);
                return Err(DotstrapError::UserCancelled);
            }
            if let Some(timeout) = spec.timeout {
                if start.elapsed() >= timeout {
                    kill_group(child);
                    return Err(DotstrapError::Timeout {
                        command: spec.display_line(),
                        timeout,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Drain a pipe on a background thread so the child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Gives the controlling terminal to the child's process group while held.
///
/// Children run in their own group so a timeout can kill the whole tree, but
/// only the foreground group may read the terminal (sudo and gpg prompts).
/// Dropping the guard hands the terminal back to this process.
struct ForegroundGuard {
    #[cfg(unix)]
    parent_pgrp: libc::pid_t,
}

impl ForegroundGuard {
    /// `None` unless stdin is a terminal this process currently owns.
    fn acquire() -> Option<Self> {
        #[cfg(unix)]
        {
            // SAFETY: isatty, tcgetpgrp and getpgrp only query process state.
            let owned = unsafe {
                libc::isatty(libc::STDIN_FILENO) == 1
                    && libc::tcgetpgrp(libc::STDIN_FILENO) == libc::getpgrp()
            };
            // SAFETY: as above.
            owned.then(|| Self {
                parent_pgrp: unsafe { libc::getpgrp() },
            })
        }
        #[cfg(not(unix))]
        {
            None
        }
    }
}

#[cfg(unix)]
impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        // SAFETY: SIGTTOU is ignored only around the tcsetpgrp call, which a
        // background group must make to take the terminal back.
        unsafe {
            let previous = libc::signal(libc::SIGTTOU, libc::SIG_IGN);
            libc::tcsetpgrp(libc::STDIN_FILENO, self.parent_pgrp);
            if previous != libc::SIG_ERR {
                libc::signal(libc::SIGTTOU, previous);
            }
        }
    }
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        // SAFETY: killpg only sends a signal; the pgid is the child's own group.
        unsafe {
            libc::killpg(child.id() as libc::pid_t, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

impl Commander for SystemCommander {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", spec.display_line());

        let terminal = ForegroundGuard::acquire();
        let mut child = self.spawn(spec, terminal.is_some())?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // Pipes close once the process group is killed, so the drain threads finish.
        let status = self.wait(&mut child, spec);
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        drop(terminal);
        let status = status?;

        tracing::debug!("Exit {:?}: {}", status.code(), spec.program);

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// A scripted response for [`RecordingCommander`].
#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    Timeout,
}

/// Test double that records command lines and replays scripted outputs.
///
/// Responses are matched by command-line prefix; the longest matching prefix
/// wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct RecordingCommander {
    responses: Mutex<Vec<(String, Scripted)>>,
    history: Mutex<Vec<String>>,
    specs: Mutex<Vec<CommandSpec>>,
}

impl RecordingCommander {
    /// Create a commander where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to commands starting with `prefix`.
    pub fn respond(&self, prefix: &str, output: CommandOutput) -> &Self {
        self.push(prefix, Scripted::Output(output));
        self
    }

    /// Make commands starting with `prefix` time out.
    pub fn time_out(&self, prefix: &str) -> &Self {
        self.push(prefix, Scripted::Timeout);
        self
    }

    fn push(&self, prefix: &str, scripted: Scripted) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.retain(|(p, _)| p != prefix);
            responses.push((prefix.to_string(), scripted));
        }
    }

    /// All command lines run so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Every spec run so far, in order.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn ran(&self, prefix: &str) -> bool {
        self.history().iter().any(|line| line.starts_with(prefix))
    }
}

impl Commander for RecordingCommander {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let line = spec.display_line();
        if let Ok(mut history) = self.history.lock() {
            history.push(line.clone());
        }
        if let Ok(mut specs) = self.specs.lock() {
            specs.push(spec.clone());
        }

        let scripted = self.responses.lock().ok().and_then(|responses| {
            responses
                .iter()
                .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, s)| s.clone())
        });

        match scripted {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Timeout) => Err(DotstrapError::Timeout {
                command: line,
                timeout: spec.timeout.unwrap_or_default(),
            }),
            None => Ok(CommandOutput::ok("")),
        }
    }
}
