//! Clarification round-trip
//!
//! When the oracle cannot structure a document it answers with questions.
//! Each answered round is folded into a Q/A history that accompanies every
//! later prompt for the same document. Rounds are capped, and questions that
//! were already answered are never surfaced again.

use crate::error::ExtractorError;
use crate::types::ExtractionRequest;
use lectio_domain::{AnsweredQuestion, ClarifyingQuestion};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

/// Questions surfaced to the caller, with the state needed to resume
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationRequest {
    /// Questions still needing an answer
    pub questions: Vec<ClarifyingQuestion>,

    /// The document text, echoed back for the resumed call
    pub raw_text: String,

    /// 1-based clarification round these questions belong to
    pub round: u32,

    /// Answers from earlier rounds
    pub history: Vec<AnsweredQuestion>,
}

impl ClarificationRequest {
    /// Build the resumed request from the caller's answers, keyed by question id
    ///
    /// Questions without an answer are left out of the history.
    pub fn answer(&self, answers: &HashMap<String, String>) -> ExtractionRequest {
        let mut history = self.history.clone();
        history.extend(answered_pairs(&self.questions, answers));

        ExtractionRequest {
            text: self.raw_text.clone(),
            history,
            round: self.round,
        }
    }

    /// Questions with no entry in `answers`
    pub fn unanswered<'q>(&'q self, answers: &HashMap<String, String>) -> Vec<&'q ClarifyingQuestion> {
        self.questions
            .iter()
            .filter(|q| !answers.contains_key(&q.id))
            .collect()
    }
}

/// Pair each question with its answer, skipping blank or missing answers
pub fn answered_pairs(
    questions: &[ClarifyingQuestion],
    answers: &HashMap<String, String>,
) -> Vec<AnsweredQuestion> {
    questions
        .iter()
        .filter_map(|q| {
            answers
                .get(&q.id)
                .filter(|answer| !answer.trim().is_empty())
                .map(|answer| AnsweredQuestion::new(q.question.clone(), answer.trim()))
        })
        .collect()
}

/// Read a clarification reply: `{"needsClarification": true, "questions": [...]}`
///
/// Malformed entries are skipped and missing ids are filled positionally.
/// Returns `None` unless at least one question survives.
pub fn detect_clarification(value: &Value) -> Option<Vec<ClarifyingQuestion>> {
    if value.get("needsClarification").and_then(Value::as_bool) != Some(true) {
        return None;
    }

    let questions: Vec<ClarifyingQuestion> = value
        .get("questions")?
        .as_array()?
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| question_from_value(idx, entry))
        .collect();

    if questions.is_empty() {
        None
    } else {
        Some(questions)
    }
}

fn question_from_value(idx: usize, entry: &Value) -> Option<ClarifyingQuestion> {
    let text = entry.get("question").and_then(Value::as_str)?.trim();
    if text.is_empty() {
        return None;
    }

    let id = match entry.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("q{}", idx + 1),
    };

    let mut question = ClarifyingQuestion::new(id, text);
    if let Some(context) = entry.get("context").and_then(Value::as_str) {
        question = question.with_context(context);
    }
    if let Some(options) = entry.get("options").and_then(Value::as_array) {
        let options: Vec<&str> = options.iter().filter_map(Value::as_str).collect();
        if !options.is_empty() {
            question = question.with_options(options);
        }
    }
    Some(question)
}

/// Decides whether a round of questions may be surfaced
#[derive(Debug, Clone, Copy)]
pub struct ClarificationPolicy {
    max_rounds: u32,
}

impl ClarificationPolicy {
    /// Allow at most `max_rounds` rounds of questions per document
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    /// Turn the oracle's questions into the next round, or fail
    ///
    /// Questions already answered in `request`'s history are dropped. If none
    /// remain, or the round cap is reached, the document is too ambiguous.
    pub fn review(
        &self,
        request: &ExtractionRequest,
        questions: Vec<ClarifyingQuestion>,
    ) -> Result<ClarificationRequest, ExtractorError> {
        let asked = questions.len();
        let questions: Vec<ClarifyingQuestion> = questions
            .into_iter()
            .filter(|q| !already_answered(&request.history, q))
            .collect();

        if questions.is_empty() {
            warn!("Oracle repeated {} answered question(s)", asked);
            return Err(ExtractorError::ClarificationLimitExceeded(request.round));
        }

        let round = request.round + 1;
        if round > self.max_rounds {
            warn!("Clarification limit of {} rounds reached", self.max_rounds);
            return Err(ExtractorError::ClarificationLimitExceeded(self.max_rounds));
        }

        info!("Clarification round {}: {} question(s)", round, questions.len());
        Ok(ClarificationRequest {
            questions,
            raw_text: request.text.clone(),
            round,
            history: request.history.clone(),
        })
    }
}

fn already_answered(history: &[AnsweredQuestion], question: &ClarifyingQuestion) -> bool {
    let asked = normalize(&question.question);
    history.iter().any(|pair| normalize(&pair.question) == asked)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
