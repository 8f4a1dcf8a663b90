//! Request and response types for extraction

use crate::clarification::{answered_pairs, ClarificationRequest};
use crate::error::ExtractorError;
use crate::strategy::Strategy;
use lectio_domain::{AnsweredQuestion, ClarifyingQuestion, ParsedStudy};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// One call into the pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionRequest {
    /// Document text
    pub text: String,

    /// Clarifying questions answered so far, oldest first
    pub history: Vec<AnsweredQuestion>,

    /// Clarification rounds already completed for this document
    pub round: u32,
}

impl ExtractionRequest {
    /// First pass over a document
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            history: Vec::new(),
            round: 0,
        }
    }

    /// Resume after one clarification round
    ///
    /// `answers` maps question id to answer text. For multi-round state use
    /// [`ClarificationRequest::answer`] instead, which carries the history.
    pub fn resume(
        text: impl Into<String>,
        previous_questions: &[ClarifyingQuestion],
        answers: &HashMap<String, String>,
    ) -> Self {
        Self {
            text: text.into(),
            history: answered_pairs(previous_questions, answers),
            round: if previous_questions.is_empty() { 0 } else { 1 },
        }
    }

    /// Q/A pairs embedded in every prompt for this request
    pub fn transcript(&self) -> &[AnsweredQuestion] {
        &self.history
    }
}

/// Whether the study came back intact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Every reply parsed as sent
    Exact,
    /// At least one reply was truncated and repaired
    Salvaged,
}

/// Metadata about an extraction run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMetadata {
    /// Unique, time-ordered run identifier
    pub run_id: Uuid,

    /// Strategy that produced the study
    pub strategy: Strategy,

    /// Segments sent to the oracle (1 for single-call strategies)
    pub segments_total: usize,

    /// Segments that failed and were dropped
    pub segments_dropped: usize,

    /// Segments recovered from truncated output
    pub segments_salvaged: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// A successfully extracted study
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedStudy {
    /// The study, numbered 1..N at every level
    pub study: ParsedStudy,

    /// Exact or salvaged
    pub fidelity: Fidelity,

    /// Run metadata
    pub metadata: ExtractionMetadata,
}

/// Outcome of one pipeline call
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// A complete structure
    Success(ExtractedStudy),

    /// The oracle needs answers before it can proceed
    NeedsClarification(ClarificationRequest),

    /// The pipeline gave up
    Failure(ExtractorError),
}

impl ExtractionResult {
    /// Whether the run produced a study
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    /// The extracted study, if any
    pub fn study(&self) -> Option<&ParsedStudy> {
        match self {
            ExtractionResult::Success(extracted) => Some(&extracted.study),
            _ => None,
        }
    }

    /// Render the caller-facing JSON response
    ///
    /// One of `{success: true, study, fidelity}`,
    /// `{success: false, clarifyingQuestions, rawText}` or
    /// `{success: false, error}`.
    pub fn to_response(&self) -> Value {
        match self {
            ExtractionResult::Success(extracted) => json!({
                "success": true,
                "study": extracted.study,
                "fidelity": extracted.fidelity,
            }),
            ExtractionResult::NeedsClarification(request) => json!({
                "success": false,
                "clarifyingQuestions": request.questions,
                "rawText": request.raw_text,
            }),
            ExtractionResult::Failure(error) => json!({
                "success": false,
                "error": error.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_domain::ParsedWeek;

    fn metadata() -> ExtractionMetadata {
        ExtractionMetadata {
            run_id: Uuid::now_v7(),
            strategy: Strategy::FullDocument,
            segments_total: 1,
            segments_dropped: 0,
            segments_salvaged: 0,
            processing_time_ms: 5,
        }
    }

    #[test]
    fn test_resume_builds_transcript() {
        let questions = vec![
            ClarifyingQuestion::new("q1", "Is the preface a week?").with_options(["A", "B"]),
        ];
        let answers: HashMap<String, String> = [("q1".to_string(), "A".to_string())].into();

        let request = ExtractionRequest::resume("doc", &questions, &answers);
        assert_eq!(request.round, 1);
        assert_eq!(request.transcript(), &[AnsweredQuestion::new("Is the preface a week?", "A")]);

        let fresh = ExtractionRequest::resume("doc", &[], &HashMap::new());
        assert_eq!(fresh, ExtractionRequest::new("doc"));
    }

    #[test]
    fn test_success_response() {
        let mut study = ParsedStudy::new("Ruth");
        study.weeks.push(ParsedWeek::new("Loss"));
        let result = ExtractionResult::Success(ExtractedStudy {
            study,
            fidelity: Fidelity::Salvaged,
            metadata: metadata(),
        });

        assert!(result.is_success());
        assert_eq!(result.study().map(|s| s.title.as_str()), Some("Ruth"));
        let response = result.to_response();
        assert_eq!(response["success"], true);
        assert_eq!(response["fidelity"], "salvaged");
        assert_eq!(response["study"]["weeks"][0]["title"], "Loss");
    }

    #[test]
    fn test_clarification_response() {
        let result = ExtractionResult::NeedsClarification(ClarificationRequest {
            questions: vec![ClarifyingQuestion::new("q1", "Which part is week 1?")],
            raw_text: "doc".to_string(),
            round: 1,
            history: vec![],
        });
        let response = result.to_response();
        assert_eq!(response["success"], false);
        assert_eq!(response["clarifyingQuestions"][0]["id"], "q1");
        assert_eq!(response["rawText"], "doc");
        assert!(result.study().is_none());
    }

    #[test]
    fn test_failure_response() {
        let result = ExtractionResult::Failure(ExtractorError::AllSegmentsFailed(3));
        let response = result.to_response();
        assert_eq!(response["success"], false);
        assert!(response["error"]
            .as_str()
            .unwrap()
            .contains("Could not parse any lessons"));
    }
}
