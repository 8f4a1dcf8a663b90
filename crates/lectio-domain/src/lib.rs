//! Lectio Domain Layer
//!
//! Value types shared by every Lectio crate and the trait boundary to the
//! text-generation oracle. Infrastructure (HTTP providers, the extraction
//! pipeline, the CLI) lives in other crates.
//!
//! ## Key Concepts
//!
//! - **Study**: the nested Study → Week → Day → Question structure extracted
//!   from a document
//! - **Numbering**: week, day and question numbers are positional and are
//!   always recomputed locally, never trusted from oracle output
//! - **Clarification**: questions the oracle asks instead of answering
//! - **Oracle**: an unreliable producer of structured text behind an async trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clarification;
pub mod study;
pub mod traits;

// Re-exports for convenience
pub use clarification::{AnsweredQuestion, ClarifyingQuestion};
pub use study::{ParsedDay, ParsedQuestion, ParsedStudy, ParsedWeek, QuestionType};
pub use traits::{Oracle, OracleRequest, OracleResponse, StopReason};
