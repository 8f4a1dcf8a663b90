//! Lectio CLI library.
//!
//! Reads a study guide, runs it through the extraction pipeline, answers the
//! oracle's clarifying questions at the terminal, and prints the result.

pub mod answers;
pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
