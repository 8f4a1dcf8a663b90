//! Error types for the CLI application.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit status when questions are left unanswered in non-interactive mode.
pub const EXIT_NEEDS_CLARIFICATION: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document could not be decoded as UTF-8 text
    #[error("Cannot read {path}: {reason}")]
    UnreadableDocument {
        /// Document path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The document holds no text
    #[error("Document {0} is empty")]
    EmptyDocument(PathBuf),

    /// Provider setup error
    #[error("Provider error: {0}")]
    Provider(#[from] lectio_llm::LlmError),

    /// The pipeline gave up
    #[error("Extraction failed: {0}")]
    Extraction(#[from] lectio_extractor::ExtractorError),

    /// Questions were left unanswered
    #[error("{0} clarifying question(s) need answers; rerun without --non-interactive")]
    NeedsClarification(usize),

    /// The user abandoned the session at a prompt
    #[error("Interrupted")]
    Interrupted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Line editor error
    #[error("Prompt error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NeedsClarification(_) => EXIT_NEEDS_CLARIFICATION,
            _ => 1,
        }
    }
}
