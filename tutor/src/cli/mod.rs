//! Command-line interface: argument definitions and command execution.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
