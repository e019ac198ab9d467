//! Applies a preference set inside the target service

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::policy::PreferenceTarget;
use super::script::{render_patch_script, ABSENT_MARKER};
use super::value::PreferenceSet;
use crate::compose::{CommandRunner, StackDriver};
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The owning application has not created its profile yet
    PreferencesAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReconcileFailure {
    DriverUnavailable,
    RemoteError { status: i32, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(ReconcileFailure),
}

impl ReconcileOutcome {
    /// Applied or skipped
    pub fn is_success(&self) -> bool {
        !matches!(self, ReconcileOutcome::Failed(_))
    }
}

/// Render the patch procedure and run it through `exec -T <service> sh -s`.
///
/// The remote file is re-read on every call.
#[instrument(skip(driver, target, desired), fields(service = %target.service, path = %target.path))]
pub fn reconcile<R: CommandRunner>(
    driver: &StackDriver<R>,
    target: &PreferenceTarget,
    desired: &PreferenceSet,
) -> ReconcileOutcome {
    let script = render_patch_script(target, desired);

    let outcome = match driver.exec(&target.service, &["sh", "-s"], Some(script)) {
        Err(PortalError::ComposeUnavailable) => {
            ReconcileOutcome::Failed(ReconcileFailure::DriverUnavailable)
        }
        Err(e) => ReconcileOutcome::Failed(ReconcileFailure::RemoteError {
            status: -1,
            detail: e.to_string(),
        }),
        Ok(out) if !out.success() => ReconcileOutcome::Failed(ReconcileFailure::RemoteError {
            status: out.status,
            detail: out.stderr.trim().to_string(),
        }),
        Ok(out) if out.stdout.lines().any(|l| l.trim() == ABSENT_MARKER) => {
            ReconcileOutcome::Skipped(SkipReason::PreferencesAbsent)
        }
        Ok(_) => ReconcileOutcome::Applied,
    };

    match &outcome {
        ReconcileOutcome::Applied => info!(keys = desired.len(), "preferences applied"),
        ReconcileOutcome::Skipped(reason) => info!(?reason, "preferences skipped"),
        ReconcileOutcome::Failed(failure) => warn!(?failure, "preference reconciliation failed"),
    }
    outcome
}
