//! Project and service identifiers

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// The stack instance every compose call is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    manifest: PathBuf,
    name: String,
}

impl Project {
    pub fn new(manifest: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            name: name.into(),
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `-f <manifest> --project-name <name>`
    pub fn scope_args(&self) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.manifest.to_string_lossy().into_owned(),
            "--project-name".to_string(),
            self.name.clone(),
        ]
    }
}

/// A service defined in the compose manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args() {
        let project = Project::new("/srv/portal/docker-compose.yml", "darkweb_portal");
        assert_eq!(
            project.scope_args(),
            vec!["-f", "/srv/portal/docker-compose.yml", "--project-name", "darkweb_portal"]
        );
    }
}
