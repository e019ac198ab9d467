//! Detection of the usable compose command
//!
//! The plugin form (`docker compose`) is preferred and must answer a
//! `version` probe; the standalone `docker-compose` binary is taken on faith
//! when it is on the search path.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::runner::{CommandRunner, Invocation};

/// Finds executables on the host
pub trait ExecutableLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks executables up on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ExecutableLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Plugin,
    Standalone,
}

/// The tokens that invoke the orchestration tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationCommand {
    kind: CommandKind,
    tokens: Vec<String>,
}

impl OrchestrationCommand {
    /// `<docker> compose`
    pub fn plugin(docker: &Path) -> Self {
        Self {
            kind: CommandKind::Plugin,
            tokens: vec![docker.to_string_lossy().into_owned(), "compose".to_string()],
        }
    }

    /// `<docker-compose>`
    pub fn standalone(binary: &Path) -> Self {
        Self {
            kind: CommandKind::Standalone,
            tokens: vec![binary.to_string_lossy().into_owned()],
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// Tokens after the program itself
    pub fn leading_args(&self) -> &[String] {
        &self.tokens[1..]
    }
}

impl fmt::Display for OrchestrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Resolves the compose command once and remembers the answer
pub struct CommandResolver {
    locator: Box<dyn ExecutableLocator>,
    resolved: OnceCell<Option<OrchestrationCommand>>,
}

impl CommandResolver {
    pub fn new(locator: impl ExecutableLocator + 'static) -> Self {
        Self {
            locator: Box::new(locator),
            resolved: OnceCell::new(),
        }
    }

    /// Resolver that probes the real `PATH`
    pub fn system() -> Self {
        Self::new(PathLocator)
    }

    /// Resolver with a predetermined answer; never probes
    pub fn fixed(command: Option<OrchestrationCommand>) -> Self {
        let resolved = OnceCell::new();
        let _ = resolved.set(command);
        Self {
            locator: Box::new(PathLocator),
            resolved,
        }
    }

    /// The usable command, or `None` when compose is not available.
    ///
    /// Probing happens on the first call only.
    pub fn resolve(&self, runner: &dyn CommandRunner) -> Option<&OrchestrationCommand> {
        self.resolved
            .get_or_init(|| {
                let found = self.probe(runner);
                match &found {
                    Some(cmd) => info!(command = %cmd, "compose command resolved"),
                    None => info!("no compose command found"),
                }
                found
            })
            .as_ref()
    }

    fn probe(&self, runner: &dyn CommandRunner) -> Option<OrchestrationCommand> {
        if let Some(docker) = self.locator.locate("docker") {
            let candidate = OrchestrationCommand::plugin(&docker);
            let probe = Invocation::new(
                candidate.program(),
                vec!["compose".to_string(), "version".to_string()],
            )
            .captured();

            match runner.run(&probe) {
                Ok(out) if out.success() => return Some(candidate),
                Ok(out) => debug!(status = out.status, "docker compose version probe failed"),
                Err(e) => debug!(error = %e, "docker compose version probe could not run"),
            }
        }

        self.locator
            .locate("docker-compose")
            .map(|binary| OrchestrationCommand::standalone(&binary))
    }
}

impl fmt::Debug for CommandResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandResolver")
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}
