//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
///
/// All lengths are in characters (Unicode scalar values); output ceilings are
/// in oracle tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Documents longer than this take the segmented path
    pub large_document_threshold: usize,

    /// Hard cap applied to the text before the concise single-call fallback
    pub concise_char_cap: usize,

    /// Maximum concurrent oracle calls in the segmented path
    pub batch_size: usize,

    /// Leading characters sent to the header (metadata) call
    pub header_sample_chars: usize,

    /// Segments whose trimmed length does not exceed this are ignored
    pub min_segment_chars: usize,

    /// Clarification rounds allowed before giving up
    pub max_clarification_rounds: u32,

    /// Maximum time for a single oracle call (seconds)
    pub oracle_timeout_secs: u64,

    /// Output ceiling for the full-document prompt
    pub full_max_tokens: u32,

    /// Output ceiling for the concise prompt
    pub concise_max_tokens: u32,

    /// Output ceiling for one single-lesson call
    pub lesson_max_tokens: u32,

    /// Output ceiling for the header call
    pub header_max_tokens: u32,

    /// Title used when the header call fails or returns none
    pub default_title: String,
}

impl ExtractorConfig {
    /// Get the oracle call timeout as a Duration
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.large_document_threshold == 0 {
            return Err("large_document_threshold must be greater than 0".to_string());
        }
        if self.concise_char_cap < self.large_document_threshold {
            return Err("concise_char_cap cannot be below large_document_threshold".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.oracle_timeout_secs == 0 {
            return Err("oracle_timeout_secs must be greater than 0".to_string());
        }
        if self.full_max_tokens == 0
            || self.concise_max_tokens == 0
            || self.lesson_max_tokens == 0
            || self.header_max_tokens == 0
        {
            return Err("output ceilings must be greater than 0".to_string());
        }
        if self.default_title.trim().is_empty() {
            return Err("default_title must not be blank".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            large_document_threshold: 50_000,
            concise_char_cap: 80_000,
            batch_size: 3,
            header_sample_chars: 3_000,
            min_segment_chars: 100,
            max_clarification_rounds: 3,
            oracle_timeout_secs: 120,
            full_max_tokens: 16_000,
            concise_max_tokens: 16_000,
            lesson_max_tokens: 8_000,
            header_max_tokens: 1_024,
            default_title: "Untitled Study".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Conservative preset: one call at a time, longer timeouts
    pub fn conservative() -> Self {
        Self {
            batch_size: 1,
            oracle_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Fast preset: wider batches, shorter timeouts
    pub fn fast() -> Self {
        Self {
            batch_size: 6,
            oracle_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
