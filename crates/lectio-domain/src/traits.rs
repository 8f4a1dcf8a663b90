//! Trait definitions for external interactions
//!
//! The oracle is an external text-generation service. Everything that picks
//! prompts, parses replies or recovers from bad output sits above this trait,
//! so implementations only move text over the wire.

use async_trait::async_trait;
use std::fmt;

/// Why the oracle stopped producing output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Output ended normally
    Completed,
    /// Output was cut off at the requested ceiling
    LengthLimit,
    /// Any other provider-specific reason
    Other(String),
}

impl StopReason {
    /// Whether output was cut off by the length ceiling
    pub fn is_truncated(&self) -> bool {
        matches!(self, StopReason::LengthLimit)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("completed"),
            StopReason::LengthLimit => f.write_str("length_limit"),
            StopReason::Other(reason) => write!(f, "other({})", reason),
        }
    }
}

/// One request to the oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    /// System instruction (the prompt variant)
    pub system: String,

    /// User message carrying the document text
    pub user: String,

    /// Output length ceiling, in tokens
    pub max_output_tokens: u32,
}

impl OracleRequest {
    /// Create a request
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_output_tokens,
        }
    }
}

/// Raw oracle reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    /// Generated text; `None` when the reply carried no text block
    pub text: Option<String>,

    /// The oracle's stated stop condition
    pub stop_reason: StopReason,
}

impl OracleResponse {
    /// A normally completed reply
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            stop_reason: StopReason::Completed,
        }
    }

    /// A reply cut off at the output ceiling
    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            stop_reason: StopReason::LengthLimit,
        }
    }
}

/// Trait for text-generation oracles
///
/// Implemented by the infrastructure layer (lectio-llm)
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Error type for oracle operations
    type Error: fmt::Display + Send;

    /// Generate a reply for one request
    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, Self::Error>;
}
