//! Readiness polling
//!
//! Waits for a service to show up in `ps --filter status=running`. Failed
//! queries are not fatal; only the deadline ends an unsuccessful wait.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compose::{CancelFlag, CommandRunner, ServiceName, StackDriver};

/// Source of time and sleep for the poll loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(2),
        }
    }
}

/// What a poll run observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    /// The wait was abandoned through a [`CancelFlag`]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
    /// Number of `ps` queries issued
    pub polls: u32,
    #[serde(rename = "waited_ms", serialize_with = "as_millis")]
    pub waited: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Poll until `service` is running, `settings.timeout` elapses or `cancel`
/// is raised. A timeout too large to represent never expires.
pub fn poll_until_running<R: CommandRunner>(
    driver: &StackDriver<R>,
    service: &ServiceName,
    settings: &PollSettings,
    clock: &dyn Clock,
    cancel: &CancelFlag,
) -> Readiness {
    let started = clock.now();
    let deadline = started.checked_add(settings.timeout);
    let mut polls = 0;

    let finish = |ready: bool, cancelled: bool, polls: u32| Readiness {
        ready,
        cancelled,
        polls,
        waited: clock.now().saturating_duration_since(started),
    };

    loop {
        polls += 1;
        match driver.running_services() {
            Ok(names) if names.iter().any(|n| n == service.as_str()) => {
                let readiness = finish(true, false, polls);
                info!(%service, polls, waited = ?readiness.waited, "service running");
                return readiness;
            }
            Ok(_) => debug!(%service, polls, "not running yet"),
            Err(e) => debug!(%service, polls, error = %e, "running-services query failed"),
        }

        if cancel.is_raised() {
            let readiness = finish(false, true, polls);
            info!(%service, polls, "wait cancelled");
            return readiness;
        }

        if deadline.is_some_and(|d| clock.now() >= d) {
            let readiness = finish(false, false, polls);
            warn!(%service, polls, waited = ?readiness.waited, "gave up waiting for service");
            return readiness;
        }

        clock.sleep(settings.interval);
    }
}

/// `true` once `service` is observed running before the deadline
pub fn wait_until_running<R: CommandRunner>(
    driver: &StackDriver<R>,
    service: &ServiceName,
    timeout: Duration,
    poll_interval: Duration,
    clock: &dyn Clock,
) -> bool {
    let settings = PollSettings {
        timeout,
        interval: poll_interval,
    };
    poll_until_running(driver, service, &settings, clock, &CancelFlag::new()).ready
}
