//! Process execution for compose invocations
//!
//! Everything that leaves the process goes through [`CommandRunner`], so the
//! resolver, driver, poller and reconciler can be exercised against a
//! scripted runner in tests.

use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PortalError, Result};

/// How often a supervised child is checked for exit or cancellation
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(100);

/// A fully assembled external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Text fed to the child's standard input
    pub stdin: Option<String>,
    /// Capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
            capture: false,
        }
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn with_stdin(mut self, input: String) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Printable form of the command, for logs
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                parts.push(format!("\"{}\"", arg.replace('"', "\\\"")));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Exit status plus whatever text was captured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    /// The run was cut short through a [`CancelFlag`]
    pub interrupted: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0 && !self.interrupted
    }
}

/// Shared cancellation switch, raised from the Ctrl+C handler
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route Ctrl+C to this flag instead of terminating the process.
    ///
    /// Only one handler can exist per process.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.raise())
            .map_err(|e| PortalError::Interactive(format!("Failed to set Ctrl+C handler: {}", e)))
    }
}

pub trait CommandRunner {
    /// Run to completion
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run until the child exits or `cancel` is raised, in which case the
    /// child is killed and reaped before returning.
    fn run_cancelable(&self, invocation: &Invocation, cancel: &CancelFlag) -> Result<CommandOutput> {
        let _ = cancel;
        self.run(invocation)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).run(invocation)
    }

    fn run_cancelable(&self, invocation: &Invocation, cancel: &CancelFlag) -> Result<CommandOutput> {
        (**self).run_cancelable(invocation, cancel)
    }
}

/// Runs invocations as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn spawn(&self, invocation: &Invocation, capture: bool) -> Result<Child> {
        debug!(command = %invocation.command_line(), capture, "spawning");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|source| PortalError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if let (Some(input), Some(mut pipe)) = (&invocation.stdin, child.stdin.take()) {
            // a child that exits early closes its end; its status tells the story
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        Ok(child)
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let child = self.spawn(invocation, invocation.capture)?;
        let output = child.wait_with_output()?;
        let status = exit_code(output.status);
        debug!(program = %invocation.program, status, "finished");

        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            interrupted: false,
        })
    }

    fn run_cancelable(&self, invocation: &Invocation, cancel: &CancelFlag) -> Result<CommandOutput> {
        // Streams go straight to the terminal; an undrained pipe would stall the child.
        let mut child = self.spawn(invocation, false)?;

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(CommandOutput {
                    status: exit_code(status),
                    interrupted: cancel.is_raised(),
                    ..CommandOutput::default()
                });
            }

            if cancel.is_raised() {
                if let Err(e) = child.kill() {
                    warn!(program = %invocation.program, error = %e, "kill after cancellation failed");
                }
                let status = child.wait()?;
                debug!(program = %invocation.program, "stream cancelled");
                return Ok(CommandOutput {
                    status: exit_code(status),
                    interrupted: true,
                    ..CommandOutput::default()
                });
            }

            thread::sleep(SUPERVISE_INTERVAL);
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or(if status.success() { 0 } else { 1 })
}
