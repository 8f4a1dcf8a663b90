//! Command implementations.

pub mod config;
pub mod extract;

pub use self::config::execute_config;
pub use self::extract::{execute_extract, run_extraction};
