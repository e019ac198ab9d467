//! Runtime configuration
//!
//! The project is fixed; only the manifest location and the readiness
//! timings can be changed, from flags or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::compose::Project;
use crate::error::{PortalError, Result};
use crate::prefs::PreferenceTarget;
use crate::readiness::PollSettings;

pub const PROJECT_NAME: &str = "darkweb_portal";
pub const COMPOSE_FILE_ENV: &str = "DARKWEB_PORTAL_COMPOSE_FILE";
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_LOG_TAIL: u32 = 50;

/// Where a running service can be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoint {
    pub label: &'static str,
    pub url: &'static str,
}

pub const SERVICE_ENDPOINTS: &[ServiceEndpoint] = &[
    ServiceEndpoint {
        label: "Tor Browser (noVNC)",
        url: "http://localhost:5800",
    },
    ServiceEndpoint {
        label: "I2P Browser (noVNC)",
        url: "http://localhost:5801",
    },
    ServiceEndpoint {
        label: "I2P Router Console",
        url: "http://localhost:7657",
    },
];

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub project: Project,
    pub poll: PollSettings,
    pub log_tail: u32,
    pub target: PreferenceTarget,
}

impl PortalConfig {
    /// Config for an existing manifest
    pub fn new(manifest: PathBuf) -> Self {
        Self {
            project: Project::new(manifest, PROJECT_NAME),
            poll: PollSettings::default(),
            log_tail: DEFAULT_LOG_TAIL,
            target: PreferenceTarget::i2p_browser(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.poll.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_log_tail(mut self, tail: u32) -> Self {
        self.log_tail = tail;
        self
    }
}

/// Locate the compose manifest.
///
/// `explicit` comes from `--compose-file` or the environment; otherwise the
/// file next to the executable is used. A missing file is fatal.
pub fn resolve_manifest(explicit: Option<&Path>) -> Result<PathBuf> {
    let candidate = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_manifest_path()?,
    };

    if !candidate.is_file() {
        return Err(PortalError::ManifestNotFound(candidate));
    }
    Ok(candidate.canonicalize()?)
}

fn default_manifest_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(DEFAULT_COMPOSE_FILE))
}
