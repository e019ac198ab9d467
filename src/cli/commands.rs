//! Command handlers shared by the CLI and the interactive menu

use crate::compose::{
    CancelFlag, CommandOutput, CommandResolver, CommandRunner, ProcessRunner, StackDriver,
};
use crate::config::{PortalConfig, SERVICE_ENDPOINTS};
use crate::controller::{Controller, StartOutcome};
use crate::error::{PortalError, Result};
use crate::output::{Console, OutputFormat, Report};
use crate::prefs::{
    i2p_proxy_policy, reconcile, render_patch_script, PreferenceSet, PreferenceTarget,
    ReconcileOutcome,
};
use crate::readiness::Clock;

/// Everything a stack command needs, built once per process
pub struct Session<R: CommandRunner = ProcessRunner> {
    config: PortalConfig,
    driver: StackDriver<R>,
    policy: PreferenceSet,
    console: Console,
    cancel: CancelFlag,
}

impl Session<ProcessRunner> {
    /// Session talking to the real compose tool found on `PATH`
    pub fn open(config: PortalConfig, format: OutputFormat) -> Result<Self> {
        let driver = StackDriver::new(
            config.project.clone(),
            CommandResolver::system(),
            ProcessRunner::new(),
        );
        Self::with_driver(config, driver, format)
    }
}

impl<R: CommandRunner> Session<R> {
    /// JSON output keeps compose output off stdout
    pub fn with_driver(config: PortalConfig, driver: StackDriver<R>, format: OutputFormat) -> Result<Self> {
        Ok(Self {
            config,
            driver: driver.with_captured_output(format == OutputFormat::Json),
            policy: i2p_proxy_policy()?,
            console: Console::new(format),
            cancel: CancelFlag::new(),
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn driver(&self) -> &StackDriver<R> {
        &self.driver
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Flag raised by Ctrl+C; ends a log stream or a readiness wait
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Resolve the compose command now so a missing tool is reported once
    pub fn ensure_compose(&self) -> Result<()> {
        self.driver
            .command()
            .map(|_| ())
            .ok_or(PortalError::ComposeUnavailable)
    }

    /// `up`, wait for the I2P browser, sync its proxy settings.
    ///
    /// Raising the cancel flag abandons the readiness wait.
    pub fn start_stack(&self, clock: &dyn Clock) -> Report {
        self.console.info("Starting Darkweb Portal (Tor + I2P)...");
        self.cancel.reset();
        let report = Controller::new(
            &self.driver,
            &self.config.target,
            &self.policy,
            self.config.poll,
            clock,
        )
        .with_cancel(self.cancel.clone())
        .with_endpoints(SERVICE_ENDPOINTS)
        .start();
        self.cancel.reset();

        if let StartOutcome::Ready { .. } = report.outcome {
            self.console.ok("Darkweb Portal running");
        }
        Report::Start(report)
    }

    pub fn stop_stack(&self) -> Result<Report> {
        self.console.info("Stopping Darkweb Portal...");
        let out = self.driver.down()?;
        if out.success() {
            self.console.ok("Darkweb Portal stopped");
        }
        Ok(self.lifecycle("down", out))
    }

    pub fn show_status(&self) -> Result<Report> {
        self.console.info("Current Darkweb Portal status:");
        let out = self.driver.ps()?;
        Ok(self.lifecycle("status", out))
    }

    pub fn show_logs(&self, follow: bool) -> Result<Report> {
        if follow {
            self.console.info("Showing recent logs (Ctrl+C to stop)...");
        }
        self.cancel.reset();
        let out = self.driver.logs(self.config.log_tail, follow, &self.cancel);
        self.cancel.reset();

        Ok(self.lifecycle("logs", out?))
    }

    /// Reconcile preferences against the running stack
    pub fn sync_prefs(&self) -> Report {
        self.console.info("Syncing I2P proxy settings...");
        let outcome = reconcile(&self.driver, &self.config.target, &self.policy);
        if outcome == ReconcileOutcome::Applied {
            self.console.ok("I2P proxy settings synchronized");
        }
        Report::Reconcile {
            service: self.config.target.service.clone(),
            outcome,
        }
    }

    /// Captured stderr is passed on so failures stay visible
    fn lifecycle(&self, action: &str, out: CommandOutput) -> Report {
        if !out.stderr.is_empty() {
            eprint!("{}", out.stderr);
        }
        Report::Lifecycle {
            action: action.to_string(),
            status: out.status,
            interrupted: out.interrupted,
            output: self.driver.captures_output().then_some(out.stdout),
        }
    }
}

pub fn endpoints() -> Report {
    Report::Endpoints {
        endpoints: SERVICE_ENDPOINTS.to_vec(),
    }
}

/// The preference policy, optionally with the rendered patch script
pub fn policy(with_script: bool) -> Result<Report> {
    let target = PreferenceTarget::i2p_browser();
    let preferences = i2p_proxy_policy()?;
    let script = with_script.then(|| render_patch_script(&target, &preferences));
    Ok(Report::Policy {
        target,
        preferences,
        script,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{CommandOutput, OrchestrationCommand};
    use crate::prefs::ReconcileOutcome;
    use crate::testing::{FakeClock, ScriptedRunner};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn session(runner: &ScriptedRunner) -> Session<&ScriptedRunner> {
        session_with(runner, OutputFormat::Json)
    }

    fn session_with(runner: &ScriptedRunner, format: OutputFormat) -> Session<&ScriptedRunner> {
        let config = PortalConfig::new(PathBuf::from("/tmp/docker-compose.yml"))
            .with_timeout(Duration::from_secs(4))
            .with_poll_interval(Duration::from_secs(1));
        let driver = StackDriver::new(
            config.project.clone(),
            CommandResolver::fixed(Some(OrchestrationCommand::plugin(Path::new("docker")))),
            runner,
        );
        Session::with_driver(config, driver, format).unwrap()
    }

    #[test]
    fn test_stop_reports_exit_status() {
        let runner = ScriptedRunner::new().on("down", |_| CommandOutput {
            status: 4,
            ..CommandOutput::default()
        });
        let report = session(&runner).stop_stack().unwrap();

        assert!(report.is_failure());
        assert!(matches!(report, Report::Lifecycle { status: 4, .. }));
    }

    #[test]
    fn test_start_uses_configured_timeout() {
        let runner = ScriptedRunner::new();
        let clock = FakeClock::new();

        let report = session(&runner).start_stack(&clock);

        assert!(!report.is_failure());
        assert_eq!(clock.elapsed(), Duration::from_secs(4));
        assert_eq!(runner.calls_for("ps"), 5);
    }

    #[test]
    fn test_sync_prefs() {
        let runner = ScriptedRunner::new();
        let report = session(&runner).sync_prefs();

        match report {
            Report::Reconcile { service, outcome } => {
                assert_eq!(service.as_str(), "i2p-browser");
                assert_eq!(outcome, ReconcileOutcome::Applied);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_compose() {
        let runner = ScriptedRunner::new();
        let config = PortalConfig::new(PathBuf::from("/tmp/docker-compose.yml"));
        let driver = StackDriver::new(config.project.clone(), CommandResolver::fixed(None), &runner);
        let session = Session::with_driver(config, driver, OutputFormat::Json).unwrap();

        assert!(matches!(session.ensure_compose(), Err(PortalError::ComposeUnavailable)));
        assert!(matches!(session.stop_stack(), Err(PortalError::ComposeUnavailable)));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_policy_report() {
        let with_script = policy(true).unwrap();
        assert!(matches!(with_script, Report::Policy { script: Some(_), .. }));

        let without = policy(false).unwrap();
        assert!(matches!(without, Report::Policy { script: None, .. }));
    }

    #[test]
    fn test_json_mode_captures_status_table() {
        let runner = ScriptedRunner::new().on("ps", |_| CommandOutput {
            stdout: "NAME          STATUS\ni2p-browser   running\n".to_string(),
            ..CommandOutput::default()
        });

        let report = session(&runner).show_status().unwrap();

        assert!(runner.last_call().unwrap().capture);
        match report {
            Report::Lifecycle { output, .. } => {
                assert_eq!(output.as_deref(), Some("NAME          STATUS\ni2p-browser   running\n"))
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_human_mode_streams_status_table() {
        let runner = ScriptedRunner::new();

        let report = session_with(&runner, OutputFormat::Human).show_status().unwrap();

        assert!(!runner.last_call().unwrap().capture);
        assert!(matches!(report, Report::Lifecycle { output: None, .. }));
    }

    #[test]
    fn test_start_advertises_endpoints() {
        let runner = ScriptedRunner::new().on("ps", |_| CommandOutput {
            stdout: "i2p-browser\n".to_string(),
            ..CommandOutput::default()
        });

        match session(&runner).start_stack(&FakeClock::new()) {
            Report::Start(start) => assert_eq!(start.endpoints, SERVICE_ENDPOINTS),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_start_clears_stale_cancel() {
        let runner = ScriptedRunner::new().on("ps", |n| CommandOutput {
            stdout: if n >= 2 { "i2p-browser\n" } else { "" }.to_string(),
            ..CommandOutput::default()
        });
        let session = session(&runner);
        session.cancel_flag().raise();

        let report = session.start_stack(&FakeClock::new());

        assert!(matches!(report, Report::Start(ref s) if s.is_success()));
        assert!(!session.cancel_flag().is_raised());
    }
}
