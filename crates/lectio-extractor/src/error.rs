//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// Segment-level errors never leave the batcher; the rest surface to callers
/// as `ExtractionResult::Failure`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Document text is empty or whitespace only
    #[error("Document is empty: no text to extract")]
    EmptyInput,

    /// Oracle returned no usable text block
    #[error("Oracle returned no text response")]
    OracleNoResponse,

    /// Oracle transport or provider error
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Oracle call exceeded its time budget
    #[error("Oracle call timed out")]
    Timeout,

    /// Reply could not be parsed as the expected JSON
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Reply hit the output ceiling and could not be salvaged
    #[error("Oracle output was truncated and could not be recovered")]
    OutputTruncated,

    /// Reply parsed but contained no weeks
    #[error("No weeks found in extracted study")]
    NoWeeks,

    /// Single-lesson reply parsed but contained no days
    #[error("Lesson contained no days")]
    EmptyLesson,

    /// Every segment of a batched run failed
    #[error("Could not parse any lessons from the document ({0} segments attempted)")]
    AllSegmentsFailed(usize),

    /// Clarification rounds exhausted
    #[error("Document is too ambiguous: still unresolved after {0} clarification rounds")]
    ClarificationLimitExceeded(u32),

    /// Caller cancelled the run
    #[error("Extraction cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// Whether the failure came from the oracle's reply rather than the caller
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            ExtractorError::OracleNoResponse
                | ExtractorError::Oracle(_)
                | ExtractorError::Timeout
                | ExtractorError::JsonParse(_)
                | ExtractorError::OutputTruncated
                | ExtractorError::NoWeeks
                | ExtractorError::EmptyLesson
        )
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_segments_failed_message() {
        let err = ExtractorError::AllSegmentsFailed(4);
        assert!(err.to_string().contains("Could not parse any lessons"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: ExtractorError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ExtractorError::JsonParse(_)));
        assert!(err.is_oracle_failure());
        assert!(!ExtractorError::EmptyInput.is_oracle_failure());
    }
}
