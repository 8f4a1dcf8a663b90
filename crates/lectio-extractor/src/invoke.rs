//! Per-call oracle invocation
//!
//! `SegmentExtractor` issues one oracle call for a whole document or for one
//! lesson segment, then turns the reply into a typed fragment. Replies cut off
//! at the output ceiling go through truncation recovery before being given up.

use crate::clarification::detect_clarification;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_json;
use crate::prompt::{PromptBuilder, PromptVariant};
use crate::recovery::recover;
use crate::segmenter::Segment;
use crate::text::char_len;
use lectio_domain::{
    AnsweredQuestion, ClarifyingQuestion, Oracle, OracleRequest, ParsedStudy, ParsedWeek,
    StopReason,
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A decoded reply and whether it had to be salvaged
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<T> {
    /// The decoded value
    pub value: T,
    /// True when the value came from a repaired truncated reply
    pub salvaged: bool,
}

impl<T> Fragment<T> {
    fn exact(value: T) -> Self {
        Self {
            value,
            salvaged: false,
        }
    }

    fn salvaged(value: T) -> Self {
        Self {
            value,
            salvaged: true,
        }
    }
}

/// What a whole-document call produced
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentReply {
    /// A study with at least one week
    Study(Fragment<ParsedStudy>),
    /// The oracle asked questions instead
    Clarification(Vec<ClarifyingQuestion>),
}

/// Call the oracle once, bounded by `limit`
///
/// A reply with no text is `OracleNoResponse`; running out of time is
/// `Timeout`. Provider errors are flattened to their message.
pub async fn call_oracle<O: Oracle>(
    oracle: &O,
    request: OracleRequest,
    limit: Duration,
) -> Result<(String, StopReason), ExtractorError> {
    let response = timeout(limit, oracle.generate(request))
        .await
        .map_err(|_| ExtractorError::Timeout)?
        .map_err(|e| ExtractorError::Oracle(e.to_string()))?;

    match response.text {
        Some(text) if !text.trim().is_empty() => Ok((text, response.stop_reason)),
        _ => Err(ExtractorError::OracleNoResponse),
    }
}

/// Runs document and lesson extraction calls against one oracle
pub struct SegmentExtractor<'a, O: Oracle> {
    oracle: &'a O,
    config: &'a ExtractorConfig,
}

impl<'a, O: Oracle> SegmentExtractor<'a, O> {
    /// Create an extractor borrowing the oracle and configuration
    pub fn new(oracle: &'a O, config: &'a ExtractorConfig) -> Self {
        Self { oracle, config }
    }

    /// Extract a whole study in one call
    ///
    /// `variant` is `Full` or `Concise`; both may answer with clarifying
    /// questions.
    pub async fn extract_document(
        &self,
        text: &str,
        variant: PromptVariant,
        transcript: &[AnsweredQuestion],
    ) -> Result<DocumentReply, ExtractorError> {
        let max_tokens = match variant {
            PromptVariant::Concise => self.config.concise_max_tokens,
            _ => self.config.full_max_tokens,
        };
        let (reply, stop_reason) = self.call(text, variant, transcript, max_tokens).await?;

        if let Ok(value) = parse_json::<Value>(&reply) {
            if variant.allows_clarification() {
                if let Some(questions) = detect_clarification(&value) {
                    return Ok(DocumentReply::Clarification(questions));
                }
            }
            if let Ok(study) = serde_json::from_value::<ParsedStudy>(value) {
                if study.has_weeks() {
                    return Ok(DocumentReply::Study(Fragment::exact(study)));
                }
                if !stop_reason.is_truncated() {
                    return Err(ExtractorError::NoWeeks);
                }
            }
        }

        if !stop_reason.is_truncated() {
            // Surface the real parse error
            parse_json::<ParsedStudy>(&reply)?;
            return Err(ExtractorError::NoWeeks);
        }

        match recover::<ParsedStudy>(&reply).map(without_empty_weeks) {
            Some(study) if study.has_weeks() => {
                warn!(
                    "Salvaged truncated {:?} reply: {} weeks recovered",
                    variant,
                    study.weeks.len()
                );
                Ok(DocumentReply::Study(Fragment::salvaged(study)))
            }
            _ => Err(ExtractorError::OutputTruncated),
        }
    }

    /// Extract one lesson segment as a week
    pub async fn extract_lesson(
        &self,
        segment: &Segment,
        transcript: &[AnsweredQuestion],
    ) -> Result<Fragment<ParsedWeek>, ExtractorError> {
        let (reply, stop_reason) = self
            .call(
                &segment.text,
                PromptVariant::SingleLesson,
                transcript,
                self.config.lesson_max_tokens,
            )
            .await?;

        let parsed = parse_json::<Value>(&reply).and_then(lesson_from_value);
        match parsed {
            Ok(week) if week.has_content() => return Ok(Fragment::exact(week)),
            Ok(_) if !stop_reason.is_truncated() => return Err(ExtractorError::EmptyLesson),
            Err(e) if !stop_reason.is_truncated() => return Err(e),
            _ => {}
        }

        match recover::<Value>(&reply).map(lesson_from_value) {
            Some(Ok(week)) if week.has_content() => {
                warn!(
                    "Salvaged truncated lesson {}: {} days recovered",
                    segment.index,
                    week.days.len()
                );
                Ok(Fragment::salvaged(week))
            }
            _ => Err(ExtractorError::OutputTruncated),
        }
    }

    async fn call(
        &self,
        text: &str,
        variant: PromptVariant,
        transcript: &[AnsweredQuestion],
        max_tokens: u32,
    ) -> Result<(String, StopReason), ExtractorError> {
        let user = PromptBuilder::new(text).with_transcript(transcript).build();
        debug!(
            "{:?} call: prompt {} chars, max_tokens {}",
            variant,
            char_len(&user),
            max_tokens
        );

        let request = OracleRequest::new(variant.system_prompt(), user, max_tokens);
        let (reply, stop_reason) =
            call_oracle(self.oracle, request, self.config.oracle_timeout()).await?;

        debug!("{:?} reply: {} chars, stop reason {}", variant, char_len(&reply), stop_reason);
        Ok((reply, stop_reason))
    }
}

/// Drop weeks that carry no days
///
/// A cut reply can end just after a week's title; such a week holds nothing
/// the document actually said about its days.
fn without_empty_weeks(mut study: ParsedStudy) -> ParsedStudy {
    study.weeks.retain(ParsedWeek::has_content);
    study
}

/// Read a week out of a single-lesson reply
///
/// Accepts a bare week object, a `{"week": {...}}` wrapper, or a study-shaped
/// reply, in which case the first week is taken.
fn lesson_from_value(value: Value) -> Result<ParsedWeek, ExtractorError> {
    let week = match value {
        Value::Object(mut object) => {
            if let Some(Value::Array(weeks)) = object.remove("weeks") {
                weeks.into_iter().next().unwrap_or(Value::Null)
            } else if let Some(week @ Value::Object(_)) = object.remove("week") {
                week
            } else {
                Value::Object(object)
            }
        }
        other => other,
    };

    Ok(serde_json::from_value(week)?)
}
