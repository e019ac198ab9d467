//! Error types for onion-portal

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Docker Compose is not available. Install Docker Compose V2 (docker compose) or V1 (docker-compose)")]
    ComposeUnavailable,

    #[error("Compose file not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{verb}` failed (exit code {status})")]
    CommandFailed { verb: String, status: i32 },

    #[error("Invalid preference: {0}")]
    InvalidPreference(String),

    #[error("Interactive error: {0}")]
    Interactive(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortalError>;
