//! Human-readable output formatting

use crate::config::ServiceEndpoint;
use crate::controller::{StartOutcome, StartReport};
use crate::output::formatter::Report;
use crate::prefs::{format_assignment, ReconcileFailure, ReconcileOutcome, SkipReason};

pub fn format_human(report: &Report) -> String {
    match report {
        Report::Start(start) => format_start(start),
        Report::Reconcile { service, outcome } => {
            format!("{} ({})", describe_reconcile(outcome), service)
        }
        Report::Lifecycle { action, status, interrupted, .. } => {
            if *interrupted {
                format!("{} stopped by user", capitalize(action))
            } else if *status == 0 {
                format!("{} finished", capitalize(action))
            } else {
                format!("{} failed (exit code {})", capitalize(action), status)
            }
        }
        Report::Endpoints { endpoints } => format_endpoints(endpoints),
        Report::Policy { target, preferences, script } => {
            let mut output = format!(
                "Preference policy for {}\n  File: {}\n\n",
                target.service, target.path
            );
            for (key, value) in preferences.iter() {
                output.push_str(&format!("  {}\n", format_assignment(&target.keyword, key, value)));
            }
            if let Some(script) = script {
                output.push_str("\nPatch script\n------------\n");
                output.push_str(script);
            }
            output
        }
    }
}

fn format_start(report: &StartReport) -> String {
    let mut output = String::new();

    match &report.outcome {
        StartOutcome::Ready { readiness, preferences } => {
            output.push_str(&format!(
                "Stack '{}' is up; {} running after {} poll(s) ({:.1}s)\n",
                report.project,
                report.service,
                readiness.polls,
                readiness.waited.as_secs_f64()
            ));
            output.push_str(describe_reconcile(preferences));
            output.push('\n');
        }
        StartOutcome::ReadinessTimedOut { readiness } => {
            output.push_str(&format!(
                "Stack '{}' is up, but {} was not seen running within {:.0}s; proxy settings were not applied\n",
                report.project,
                report.service,
                readiness.waited.as_secs_f64()
            ));
        }
        StartOutcome::Cancelled { .. } => {
            output.push_str(&format!(
                "Stack '{}' is up; stopped waiting for {}, proxy settings were not applied\n",
                report.project, report.service
            ));
        }
        StartOutcome::Failed { failure } => {
            output.push_str(&format!("Could not start stack '{}' ({})\n", report.project, failure));
        }
    }

    let states: Vec<String> = report.states.iter().map(|s| s.to_string()).collect();
    output.push_str(&format!("States: {}", states.join(" -> ")));

    if !report.endpoints.is_empty() {
        output.push_str("\n\n");
        output.push_str(format_endpoints(&report.endpoints).trim_end());
    }
    output
}

fn format_endpoints(endpoints: &[ServiceEndpoint]) -> String {
    let mut output = String::from("Service URLs\n------------\n");
    let width = endpoints.iter().map(|e| e.label.len()).max().unwrap_or(0) + 1;
    for endpoint in endpoints {
        output.push_str(&format!(
            "  {:<width$} {}\n",
            format!("{}:", endpoint.label),
            endpoint.url,
            width = width
        ));
    }
    output
}

fn describe_reconcile(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Applied => "I2P proxy settings synchronized",
        ReconcileOutcome::Skipped(SkipReason::PreferencesAbsent) => {
            "I2P browser profile not created yet; proxy settings skipped"
        }
        ReconcileOutcome::Failed(ReconcileFailure::DriverUnavailable) => {
            "Could not update I2P proxy settings: Docker Compose is not available"
        }
        ReconcileOutcome::Failed(ReconcileFailure::RemoteError { .. }) => {
            "Could not update I2P proxy settings; check the container manually"
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
