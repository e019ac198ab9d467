//! CLI module

pub mod args;
pub mod commands;

pub use args::{Args, SubCommand};
pub use commands::{endpoints, policy, Session};
