//! Stack driver: lifecycle verbs scoped to one compose project

use std::fmt;

use tracing::{debug, instrument};

use super::project::{Project, ServiceName};
use super::resolver::{CommandResolver, OrchestrationCommand};
use super::runner::{CancelFlag, CommandOutput, CommandRunner, Invocation};
use crate::error::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Up,
    Down,
    Ps,
    Logs,
    Exec,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Up => "up",
            Verb::Down => "down",
            Verb::Ps => "ps",
            Verb::Logs => "logs",
            Verb::Exec => "exec",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives the compose tool for a single project
pub struct StackDriver<R: CommandRunner> {
    project: Project,
    resolver: CommandResolver,
    runner: R,
    capture_output: bool,
}

impl<R: CommandRunner> StackDriver<R> {
    pub fn new(project: Project, resolver: CommandResolver, runner: R) -> Self {
        Self {
            project,
            resolver,
            runner,
            capture_output: false,
        }
    }

    /// Capture the output of `up`, `down` and `ps` instead of letting it
    /// reach the terminal.
    pub fn with_captured_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    pub fn captures_output(&self) -> bool {
        self.capture_output
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The resolved compose command, probing on first use
    pub fn command(&self) -> Option<&OrchestrationCommand> {
        self.resolver.resolve(&self.runner)
    }

    /// Build `<command> -f <manifest> --project-name <project> <verb> <args...>`
    pub fn invocation(&self, verb: Verb, args: &[&str]) -> Result<Invocation> {
        let command = self.command().ok_or(PortalError::ComposeUnavailable)?;

        let mut full = command.leading_args().to_vec();
        full.extend(self.project.scope_args());
        full.push(verb.as_str().to_string());
        full.extend(args.iter().map(|a| a.to_string()));

        Ok(Invocation::new(command.program(), full))
    }

    /// Run a verb. A non-zero exit is returned as a normal result.
    pub fn invoke(&self, verb: Verb, args: &[&str], capture: bool) -> Result<CommandOutput> {
        let mut invocation = self.invocation(verb, args)?;
        invocation.capture = capture;
        self.runner.run(&invocation)
    }

    /// `up -d --build`
    #[instrument(skip(self), fields(project = %self.project.name()))]
    pub fn up(&self) -> Result<CommandOutput> {
        self.invoke(Verb::Up, &["-d", "--build"], self.capture_output)
    }

    #[instrument(skip(self), fields(project = %self.project.name()))]
    pub fn down(&self) -> Result<CommandOutput> {
        self.invoke(Verb::Down, &[], self.capture_output)
    }

    /// Plain `ps`
    pub fn ps(&self) -> Result<CommandOutput> {
        self.invoke(Verb::Ps, &[], self.capture_output)
    }

    /// Names of the services currently running.
    ///
    /// A non-zero `ps` exit is reported as [`PortalError::CommandFailed`].
    pub fn running_services(&self) -> Result<Vec<String>> {
        let out = self.invoke(
            Verb::Ps,
            &["--services", "--filter", "status=running"],
            true,
        )?;
        if !out.success() {
            return Err(PortalError::CommandFailed {
                verb: Verb::Ps.to_string(),
                status: out.status,
            });
        }

        let names: Vec<String> = out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        debug!(running = ?names, "ps");
        Ok(names)
    }

    /// `logs --tail <n> [-f]`; following streams until the process ends or
    /// `cancel` is raised.
    pub fn logs(&self, tail: u32, follow: bool, cancel: &CancelFlag) -> Result<CommandOutput> {
        let tail = tail.to_string();
        let mut args = vec!["--tail", tail.as_str()];
        if follow {
            args.push("-f");
        }
        let invocation = self.invocation(Verb::Logs, &args)?;

        if follow {
            self.runner.run_cancelable(&invocation, cancel)
        } else {
            self.runner.run(&invocation)
        }
    }

    /// `exec -T <service> <command...>` with captured output and optional
    /// standard input.
    #[instrument(skip(self, command, stdin), fields(project = %self.project.name()))]
    pub fn exec(
        &self,
        service: &ServiceName,
        command: &[&str],
        stdin: Option<String>,
    ) -> Result<CommandOutput> {
        let mut args = vec!["-T", service.as_str()];
        args.extend_from_slice(command);

        let mut invocation = self.invocation(Verb::Exec, &args)?.captured();
        if let Some(input) = stdin {
            invocation = invocation.with_stdin(input);
        }
        self.runner.run(&invocation)
    }
}

impl<R: CommandRunner> fmt::Debug for StackDriver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackDriver")
            .field("project", &self.project)
            .field("resolver", &self.resolver)
            .field("capture_output", &self.capture_output)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use std::path::Path;

    fn driver(runner: &ScriptedRunner) -> StackDriver<&ScriptedRunner> {
        StackDriver::new(
            Project::new("/srv/portal/docker-compose.yml", "darkweb_portal"),
            CommandResolver::fixed(Some(OrchestrationCommand::plugin(Path::new("/usr/bin/docker")))),
            runner,
        )
    }

    #[test]
    fn test_invocation_is_project_scoped() {
        let runner = ScriptedRunner::new();
        let inv = driver(&runner).invocation(Verb::Down, &[]).unwrap();

        assert_eq!(inv.program, "/usr/bin/docker");
        assert_eq!(
            inv.args,
            [
                "compose",
                "-f",
                "/srv/portal/docker-compose.yml",
                "--project-name",
                "darkweb_portal",
                "down"
            ]
        );
    }

    #[test]
    fn test_standalone_invocation_has_no_subcommand() {
        let runner = ScriptedRunner::new();
        let driver = StackDriver::new(
            Project::new("/tmp/c.yml", "p"),
            CommandResolver::fixed(Some(OrchestrationCommand::standalone(Path::new(
                "/usr/local/bin/docker-compose",
            )))),
            &runner,
        );
        let inv = driver.invocation(Verb::Up, &["-d", "--build"]).unwrap();

        assert_eq!(inv.program, "/usr/local/bin/docker-compose");
        assert_eq!(inv.args, ["-f", "/tmp/c.yml", "--project-name", "p", "up", "-d", "--build"]);
    }

    #[test]
    fn test_unavailable_runs_nothing() {
        let runner = ScriptedRunner::new();
        let driver = StackDriver::new(
            Project::new("/tmp/c.yml", "p"),
            CommandResolver::fixed(None),
            &runner,
        );

        assert!(matches!(driver.up(), Err(PortalError::ComposeUnavailable)));
        assert!(matches!(driver.down(), Err(PortalError::ComposeUnavailable)));
        assert!(matches!(driver.ps(), Err(PortalError::ComposeUnavailable)));
        assert!(matches!(driver.running_services(), Err(PortalError::ComposeUnavailable)));
        assert!(matches!(
            driver.logs(50, true, &CancelFlag::new()),
            Err(PortalError::ComposeUnavailable)
        ));
        assert!(matches!(
            driver.exec(&ServiceName::new("svc"), &["true"], None),
            Err(PortalError::ComposeUnavailable)
        ));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_non_zero_exit_is_a_result() {
        let runner = ScriptedRunner::new().on("up", |_| CommandOutput {
            status: 17,
            ..CommandOutput::default()
        });
        let out = driver(&runner).up().unwrap();
        assert_eq!(out.status, 17);
    }

    #[test]
    fn test_running_services_parses_lines() {
        let runner = ScriptedRunner::new().on("ps", |_| CommandOutput {
            stdout: "tor-browser\n  i2p-browser  \n\ni2p-router\n".to_string(),
            ..CommandOutput::default()
        });
        let names = driver(&runner).running_services().unwrap();
        assert_eq!(names, ["tor-browser", "i2p-browser", "i2p-router"]);

        let call = runner.last_call().unwrap();
        assert!(call.capture);
        assert!(call.args.ends_with(&[
            "ps".to_string(),
            "--services".to_string(),
            "--filter".to_string(),
            "status=running".to_string()
        ]));
    }

    #[test]
    fn test_running_services_failed_query() {
        let runner = ScriptedRunner::new().on("ps", |_| CommandOutput {
            status: 1,
            ..CommandOutput::default()
        });
        let err = driver(&runner).running_services().unwrap_err();
        assert!(matches!(err, PortalError::CommandFailed { status: 1, .. }));
    }

    #[test]
    fn test_exec_passes_stdin_and_target() {
        let runner = ScriptedRunner::new();
        driver(&runner)
            .exec(&ServiceName::new("i2p-browser"), &["sh", "-s"], Some("echo hi\n".to_string()))
            .unwrap();

        let call = runner.last_call().unwrap();
        assert!(call.args.ends_with(&[
            "exec".to_string(),
            "-T".to_string(),
            "i2p-browser".to_string(),
            "sh".to_string(),
            "-s".to_string()
        ]));
        assert_eq!(call.stdin.as_deref(), Some("echo hi\n"));
    }

    #[test]
    fn test_logs_follow_flag() {
        let runner = ScriptedRunner::new();
        driver(&runner).logs(50, true, &CancelFlag::new()).unwrap();
        let call = runner.last_call().unwrap();
        assert!(call.args.ends_with(&["logs".to_string(), "--tail".to_string(), "50".to_string(), "-f".to_string()]));

        driver(&runner).logs(10, false, &CancelFlag::new()).unwrap();
        let call = runner.last_call().unwrap();
        assert!(call.args.ends_with(&["--tail".to_string(), "10".to_string()]));
    }

    #[test]
    fn test_captured_output_mode() {
        let runner = ScriptedRunner::new();
        let plain = driver(&runner);
        plain.ps().unwrap();
        assert!(!runner.last_call().unwrap().capture);

        let quiet = driver(&runner).with_captured_output(true);
        quiet.up().unwrap();
        assert!(runner.last_call().unwrap().capture);
        quiet.down().unwrap();
        assert!(runner.last_call().unwrap().capture);
        quiet.logs(5, false, &CancelFlag::new()).unwrap();
        assert!(!runner.last_call().unwrap().capture);
    }
}
