//! Compose integration: command discovery, process execution and the
//! project-scoped stack driver.

mod driver;
mod project;
mod resolver;
mod runner;

pub use driver::{StackDriver, Verb};
pub use project::{Project, ServiceName};
pub use resolver::{CommandKind, CommandResolver, ExecutableLocator, OrchestrationCommand, PathLocator};
pub use runner::{CancelFlag, CommandOutput, CommandRunner, Invocation, ProcessRunner};
