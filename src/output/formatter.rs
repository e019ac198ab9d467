//! Output formatting

use serde::Serialize;

use crate::compose::ServiceName;
use crate::config::ServiceEndpoint;
use crate::controller::StartReport;
use crate::output::human::format_human;
use crate::output::json::format_json;
use crate::prefs::{PreferenceSet, PreferenceTarget, ReconcileOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Something a command reports when it finishes
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    Start(StartReport),
    Reconcile {
        service: ServiceName,
        outcome: ReconcileOutcome,
    },
    /// A single-shot verb (`down`, `ps`, `logs`)
    Lifecycle {
        action: String,
        status: i32,
        interrupted: bool,
        /// Captured standard output, in JSON mode
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Endpoints {
        endpoints: Vec<ServiceEndpoint>,
    },
    Policy {
        target: PreferenceTarget,
        preferences: PreferenceSet,
        #[serde(skip_serializing_if = "Option::is_none")]
        script: Option<String>,
    },
}

impl Report {
    /// Whether the command should exit non-zero
    pub fn is_failure(&self) -> bool {
        match self {
            Report::Start(start) => start.is_fatal(),
            Report::Reconcile { outcome, .. } => !outcome.is_success(),
            Report::Lifecycle { status, interrupted, .. } => *status != 0 && !*interrupted,
            Report::Endpoints { .. } | Report::Policy { .. } => false,
        }
    }
}

pub fn format_output(report: &Report, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(report),
        OutputFormat::Json => format_json(report),
    }
}
