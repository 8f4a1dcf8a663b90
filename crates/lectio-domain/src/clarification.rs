//! Clarifying questions raised by the oracle

use serde::{Deserialize, Serialize};

/// A question the oracle asks instead of returning a structure
///
/// `id` is unique within one clarification round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    /// Identifier the caller uses to key its answer
    pub id: String,

    /// The question text
    pub question: String,

    /// Why the oracle is asking
    #[serde(default)]
    pub context: String,

    /// Suggested answers, if the question has a finite set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl ClarifyingQuestion {
    /// Create a free-form question
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            context: String::new(),
            options: None,
        }
    }

    /// Attach supporting context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Attach suggested options
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// A clarifying question paired with the caller's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    /// Question text as it was asked
    pub question: String,

    /// The caller's answer
    pub answer: String,
}

impl AnsweredQuestion {
    /// Pair a question with its answer
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}
