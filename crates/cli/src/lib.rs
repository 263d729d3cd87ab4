//! CLI tool for protocol stack descriptors.
//!
//! Provides commands for:
//! - Printing the resolved protocol stack of a descriptor
//! - Creating a channel from a descriptor and inspecting it

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
