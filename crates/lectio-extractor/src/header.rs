//! Study metadata from the document's opening section
//!
//! The segmented path never sees the whole document in one call, so title,
//! description and author come from a small separate call over the first few
//! thousand characters. Failure here only costs the metadata.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::invoke::call_oracle;
use crate::parser::parse_json;
use crate::prompt::{PromptBuilder, HEADER_SYSTEM_PROMPT};
use crate::recovery::recover;
use crate::text::truncate_chars;
use lectio_domain::{Oracle, OracleRequest};
use serde::Deserialize;
use tracing::{debug, warn};

/// Top-level study metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyHeader {
    /// Study title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional author
    pub author: Option<String>,
}

impl StudyHeader {
    /// Header used when extraction fails
    pub fn fallback(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            author: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct HeaderReply {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

impl HeaderReply {
    fn into_header(self, default_title: &str) -> StudyHeader {
        StudyHeader {
            title: non_blank(self.title).unwrap_or_else(|| default_title.to_string()),
            description: non_blank(self.description),
            author: non_blank(self.author),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

/// Extracts study metadata with one small oracle call
pub struct HeaderExtractor<'a, O: Oracle> {
    oracle: &'a O,
    config: &'a ExtractorConfig,
}

impl<'a, O: Oracle> HeaderExtractor<'a, O> {
    /// Create a header extractor borrowing the oracle and configuration
    pub fn new(oracle: &'a O, config: &'a ExtractorConfig) -> Self {
        Self { oracle, config }
    }

    /// Extract metadata, falling back to the default title on any failure
    pub async fn extract(&self, text: &str) -> StudyHeader {
        match self.try_extract(text).await {
            Ok(header) => {
                debug!("Study header: '{}'", header.title);
                header
            }
            Err(e) => {
                warn!("Header extraction failed, using defaults: {}", e);
                StudyHeader::fallback(self.config.default_title.clone())
            }
        }
    }

    async fn try_extract(&self, text: &str) -> Result<StudyHeader, ExtractorError> {
        let sample = truncate_chars(text, self.config.header_sample_chars);
        let request = OracleRequest::new(
            HEADER_SYSTEM_PROMPT,
            PromptBuilder::new(sample).build(),
            self.config.header_max_tokens,
        );

        let (reply, stop_reason) =
            call_oracle(self.oracle, request, self.config.oracle_timeout()).await?;

        let parsed = match parse_json::<HeaderReply>(&reply) {
            Ok(parsed) => parsed,
            Err(_) if stop_reason.is_truncated() => {
                recover::<HeaderReply>(&reply).ok_or(ExtractorError::OutputTruncated)?
            }
            Err(e) => return Err(e),
        };

        Ok(parsed.into_header(&self.config.default_title))
    }
}
