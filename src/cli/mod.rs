//! CLI layer for gigachain.
//!
//! Provides the command-line interface using clap, with one subcommand per
//! chain plus an interactive chat.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{execute, run};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
