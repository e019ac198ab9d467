//! onion-portal - lifecycle controller for the Darkweb Portal compose stack
//!
//! Starts a Tor + I2P browser stack through Docker Compose, waits for the
//! I2P browser container to come up, then rewrites its Firefox `user.js` so
//! the browser talks to the I2P router's proxies.
//!
//! # Example
//!
//! ```no_run
//! use onion_portal::cli::Session;
//! use onion_portal::config::{resolve_manifest, PortalConfig};
//! use onion_portal::readiness::SystemClock;
//! use onion_portal::{format_output, OutputFormat};
//!
//! let manifest = resolve_manifest(None).unwrap();
//! let session = Session::open(PortalConfig::new(manifest), OutputFormat::Human).unwrap();
//! let report = session.start_stack(&SystemClock);
//! println!("{}", format_output(&report, &OutputFormat::Human));
//! ```

pub mod cli;
pub mod compose;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod menu;
pub mod output;
pub mod prefs;
pub mod readiness;

#[cfg(test)]
mod testing;

pub use compose::{CommandResolver, CommandRunner, ProcessRunner, StackDriver};
pub use config::PortalConfig;
pub use controller::{Controller, ControllerState, StartReport};
pub use error::{PortalError, Result};
pub use output::{format_output, OutputFormat, Report};
pub use prefs::{merge_preferences, reconcile, PreferenceSet, ReconcileOutcome};
pub use readiness::{poll_until_running, wait_until_running, Clock, SystemClock};
