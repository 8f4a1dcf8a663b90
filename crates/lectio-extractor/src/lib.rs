//! Lectio Extractor
//!
//! Orchestrates oracle calls that turn a study guide's raw text into a
//! Study → Week → Day → Question structure.
//!
//! # Overview
//!
//! The oracle has a bounded output budget, does not always emit valid JSON,
//! and sometimes needs to ask before it can answer. The pipeline picks a
//! strategy by document size, splits large documents on lesson headers,
//! runs per-lesson calls in bounded batches, repairs truncated replies, and
//! reassembles the study with fresh numbering.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─ ≤ threshold ─→ full call ───────────────┐
//! Text → Strategy ───┤                                          ├─→ parse / recover → Study
//!                    └─ > threshold ─→ segment ─┬─ split ─→ header + batches → assemble
//!                                               └─ no split ─→ concise call
//! ```
//!
//! Any whole-document call may instead return clarifying questions, which the
//! caller answers and feeds back through [`ClarificationRequest::answer`].
//!
//! # Example Usage
//!
//! ```no_run
//! use lectio_extractor::{ExtractionRequest, ExtractionResult, Extractor, ExtractorConfig};
//! use lectio_llm::OllamaOracle;
//! use std::collections::HashMap;
//!
//! # async fn example() {
//! let extractor = Extractor::new(
//!     OllamaOracle::default_endpoint("llama3.1"),
//!     ExtractorConfig::default(),
//! );
//!
//! let mut request = ExtractionRequest::new(std::fs::read_to_string("ruth.txt").unwrap());
//! loop {
//!     match extractor.extract(request).await {
//!         ExtractionResult::Success(extracted) => {
//!             println!("{} weeks", extracted.study.weeks.len());
//!             break;
//!         }
//!         ExtractionResult::NeedsClarification(clarification) => {
//!             let answers: HashMap<String, String> = clarification
//!                 .questions
//!                 .iter()
//!                 .map(|q| (q.id.clone(), "Yes".to_string()))
//!                 .collect();
//!             request = clarification.answer(&answers);
//!         }
//!         ExtractionResult::Failure(e) => {
//!             eprintln!("{}", e);
//!             break;
//!         }
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]

mod assembler;
mod batcher;
mod clarification;
mod config;
mod error;
mod extractor;
mod header;
mod invoke;
mod parser;
mod prompt;
mod recovery;
mod segmenter;
mod strategy;
mod text;
mod types;

#[cfg(test)]
mod tests;

pub use assembler::{Assembly, ResultAssembler};
pub use batcher::ConcurrencyBatcher;
pub use clarification::{detect_clarification, ClarificationPolicy, ClarificationRequest};
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use header::{HeaderExtractor, StudyHeader};
pub use invoke::{DocumentReply, Fragment, SegmentExtractor};
pub use parser::{extract_json, parse_json};
pub use prompt::{PromptBuilder, PromptVariant};
pub use recovery::{recover, repair_truncated_json};
pub use segmenter::{DocumentSegmenter, HeaderPattern, Segment, Segmentation};
pub use strategy::{Strategy, StrategySelector};
pub use text::{char_len, truncate_chars};
pub use types::{
    ExtractedStudy, ExtractionMetadata, ExtractionRequest, ExtractionResult, Fidelity,
};
