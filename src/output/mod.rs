//! Output formatting module

pub mod console;
pub mod formatter;
pub mod human;
pub mod json;

pub use console::Console;
pub use formatter::{format_output, OutputFormat, Report};
