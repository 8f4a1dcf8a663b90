//! Strategy selection by document size

use crate::config::ExtractorConfig;
use crate::prompt::PromptVariant;
use crate::segmenter::Segmentation;
use crate::text::{char_len, truncate_chars};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a document is sent to the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One call over the whole document with the verbose prompt
    FullDocument,
    /// One single-lesson call per segment, batched
    Segmented,
    /// One call over the capped document with the concise prompt
    ConciseSingle,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::FullDocument => "full_document",
            Strategy::Segmented => "segmented",
            Strategy::ConciseSingle => "concise_single",
        };
        f.write_str(name)
    }
}

/// Chooses and degrades the extraction strategy
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    large_document_threshold: usize,
    concise_char_cap: usize,
}

impl StrategySelector {
    /// Create a selector with explicit limits (in characters)
    pub fn new(large_document_threshold: usize, concise_char_cap: usize) -> Self {
        Self {
            large_document_threshold,
            concise_char_cap,
        }
    }

    /// Create a selector from the extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.large_document_threshold, config.concise_char_cap)
    }

    /// Initial strategy for a document
    pub fn select(&self, text: &str) -> Strategy {
        if char_len(text) <= self.large_document_threshold {
            Strategy::FullDocument
        } else {
            Strategy::Segmented
        }
    }

    /// Strategy once segmentation has run
    ///
    /// An unsplittable document goes to the concise single call.
    pub fn after_segmentation(&self, segmentation: &Segmentation) -> Strategy {
        if segmentation.is_split() {
            Strategy::Segmented
        } else {
            Strategy::ConciseSingle
        }
    }

    /// Next coarser strategy after output truncation could not be recovered
    pub fn fallback(&self, failed: Strategy) -> Option<Strategy> {
        match failed {
            Strategy::FullDocument => Some(Strategy::Segmented),
            Strategy::Segmented | Strategy::ConciseSingle => None,
        }
    }

    /// Text sent by the concise single call
    pub fn cap_text<'t>(&self, text: &'t str) -> &'t str {
        truncate_chars(text, self.concise_char_cap)
    }

    /// Prompt used by a single-call strategy
    pub fn prompt_variant(strategy: Strategy) -> PromptVariant {
        match strategy {
            Strategy::FullDocument => PromptVariant::Full,
            Strategy::ConciseSingle => PromptVariant::Concise,
            Strategy::Segmented => PromptVariant::SingleLesson,
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{Segment, Segmentation};

    fn segmentation(parts: usize) -> Segmentation {
        Segmentation {
            pattern: if parts > 1 { Some("week") } else { None },
            segments: (0..parts)
                .map(|index| Segment {
                    index,
                    text: "x".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let selector = StrategySelector::default();
        assert_eq!(selector.select(&"a".repeat(50_000)), Strategy::FullDocument);
        assert_eq!(selector.select(&"a".repeat(50_001)), Strategy::Segmented);
    }

    #[test]
    fn test_threshold_counts_characters() {
        let selector = StrategySelector::new(10, 20);
        // 10 characters, 20 bytes
        assert_eq!(selector.select(&"é".repeat(10)), Strategy::FullDocument);
    }

    #[test]
    fn test_after_segmentation() {
        let selector = StrategySelector::default();
        assert_eq!(selector.after_segmentation(&segmentation(3)), Strategy::Segmented);
        assert_eq!(selector.after_segmentation(&segmentation(1)), Strategy::ConciseSingle);
    }

    #[test]
    fn test_fallback_chain() {
        let selector = StrategySelector::default();
        assert_eq!(selector.fallback(Strategy::FullDocument), Some(Strategy::Segmented));
        assert_eq!(selector.fallback(Strategy::Segmented), None);
        assert_eq!(selector.fallback(Strategy::ConciseSingle), None);
    }

    #[test]
    fn test_cap_text() {
        let selector = StrategySelector::new(5, 8);
        assert_eq!(selector.cap_text("abcdefghijkl"), "abcdefgh");
        assert_eq!(selector.cap_text("short"), "short");
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Strategy::ConciseSingle).unwrap(),
            serde_json::json!("concise_single")
        );
        assert_eq!(Strategy::FullDocument.to_string(), "full_document");
    }
}
