//! Start sequence: bring the stack up, wait for the preference-bearing
//! service, reconcile its preferences, report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::compose::{CancelFlag, CommandRunner, ServiceName, StackDriver};
use crate::config::ServiceEndpoint;
use crate::error::PortalError;
use crate::prefs::{reconcile, PreferenceSet, PreferenceTarget, ReconcileOutcome};
use crate::readiness::{poll_until_running, Clock, PollSettings, Readiness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    StackStarting,
    AwaitingReadiness,
    ReadinessTimedOut,
    Reconciling,
    Done,
    /// The readiness wait was interrupted by the user
    Cancelled,
    Failed,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Done | ControllerState::Cancelled | ControllerState::Failed
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::StackStarting => "stack-starting",
            ControllerState::AwaitingReadiness => "awaiting-readiness",
            ControllerState::ReadinessTimedOut => "readiness-timed-out",
            ControllerState::Reconciling => "reconciling",
            ControllerState::Done => "done",
            ControllerState::Cancelled => "cancelled",
            ControllerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why `up` did not bring the stack up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StartFailure {
    ComposeUnavailable,
    ExitStatus { status: i32 },
    Launch { detail: String },
}

impl fmt::Display for StartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartFailure::ComposeUnavailable => write!(f, "{}", PortalError::ComposeUnavailable),
            StartFailure::ExitStatus { status } => write!(f, "exit code {}", status),
            StartFailure::Launch { detail } => f.write_str(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    /// Stack up and target observed running; carries the reconciliation result
    Ready {
        readiness: Readiness,
        preferences: ReconcileOutcome,
    },
    /// Stack up but the target never showed as running; preferences skipped
    ReadinessTimedOut { readiness: Readiness },
    /// Stack up, wait interrupted; preferences skipped
    Cancelled { readiness: Readiness },
    Failed { failure: StartFailure },
}

#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub project: String,
    pub service: ServiceName,
    pub states: Vec<ControllerState>,
    pub outcome: StartOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Where the services can be reached, once the stack is up
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<ServiceEndpoint>,
}

impl StartReport {
    /// Stack up, target ready and preferences applied (or legitimately skipped)
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, StartOutcome::Ready { preferences, .. } if preferences.is_success())
    }

    /// `up` itself failed
    pub fn is_fatal(&self) -> bool {
        matches!(self.outcome, StartOutcome::Failed { .. })
    }

    pub fn final_state(&self) -> ControllerState {
        self.states.last().copied().unwrap_or(ControllerState::Idle)
    }
}

/// Sequences the start of the stack
pub struct Controller<'a, R: CommandRunner> {
    driver: &'a StackDriver<R>,
    target: &'a PreferenceTarget,
    policy: &'a PreferenceSet,
    poll: PollSettings,
    clock: &'a dyn Clock,
    cancel: CancelFlag,
    endpoints: &'a [ServiceEndpoint],
}

impl<'a, R: CommandRunner> Controller<'a, R> {
    pub fn new(
        driver: &'a StackDriver<R>,
        target: &'a PreferenceTarget,
        policy: &'a PreferenceSet,
        poll: PollSettings,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            driver,
            target,
            policy,
            poll,
            clock,
            cancel: CancelFlag::new(),
            endpoints: &[],
        }
    }

    /// Abandon the readiness wait when `cancel` is raised
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Endpoints to advertise once `up` succeeded
    pub fn with_endpoints(mut self, endpoints: &'a [ServiceEndpoint]) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Run the whole sequence once. No step is retried.
    pub fn start(&self) -> StartReport {
        let started_at = Utc::now();
        let mut states = vec![ControllerState::Idle];
        let mut enter = |state: ControllerState| {
            info!(%state, "controller");
            states.push(state);
        };

        enter(ControllerState::StackStarting);
        let up_failure = match self.driver.up() {
            Ok(out) if out.success() => None,
            Ok(out) => {
                if !out.stderr.is_empty() {
                    warn!(stderr = %out.stderr.trim(), "up reported errors");
                }
                Some(StartFailure::ExitStatus { status: out.status })
            }
            Err(PortalError::ComposeUnavailable) => Some(StartFailure::ComposeUnavailable),
            Err(e) => Some(StartFailure::Launch { detail: e.to_string() }),
        };

        let outcome = match up_failure {
            Some(failure) => {
                warn!(%failure, "stack did not start");
                enter(ControllerState::Failed);
                StartOutcome::Failed { failure }
            }
            None => {
                enter(ControllerState::AwaitingReadiness);
                let readiness = poll_until_running(
                    self.driver,
                    &self.target.service,
                    &self.poll,
                    self.clock,
                    &self.cancel,
                );

                if readiness.ready {
                    enter(ControllerState::Reconciling);
                    let preferences = reconcile(self.driver, self.target, self.policy);
                    enter(ControllerState::Done);
                    StartOutcome::Ready { readiness, preferences }
                } else if readiness.cancelled {
                    enter(ControllerState::Cancelled);
                    StartOutcome::Cancelled { readiness }
                } else {
                    enter(ControllerState::ReadinessTimedOut);
                    enter(ControllerState::Done);
                    StartOutcome::ReadinessTimedOut { readiness }
                }
            }
        };

        let endpoints = match outcome {
            StartOutcome::Failed { .. } => Vec::new(),
            _ => self.endpoints.to_vec(),
        };

        StartReport {
            project: self.driver.project().name().to_string(),
            service: self.target.service.clone(),
            states,
            outcome,
            started_at,
            finished_at: Utc::now(),
            endpoints,
        }
    }
}
