//! LLM prompt engineering for study extraction
//!
//! Three system prompts share one output schema. The full prompt asks for
//! verbatim text; the concise prompt trades fidelity for output budget; the
//! single-lesson prompt asks for one week object with no study wrapper.

use lectio_domain::AnsweredQuestion;

/// Which system instruction to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Whole document, verbatim content and questions
    Full,
    /// Whole document, summarized content and clipped questions
    Concise,
    /// One already-segmented lesson, returned as a single week
    SingleLesson,
}

impl PromptVariant {
    /// System instruction for this variant
    pub fn system_prompt(self) -> String {
        match self {
            PromptVariant::Full => format!(
                "{}\n\n{}\n\n{}\n\n{}",
                STUDY_ROLE, FULL_RULES, STUDY_SCHEMA, CLARIFICATION_RULES
            ),
            PromptVariant::Concise => format!(
                "{}\n\n{}\n\n{}\n\n{}",
                STUDY_ROLE, CONCISE_RULES, STUDY_SCHEMA, CLARIFICATION_RULES
            ),
            PromptVariant::SingleLesson => format!("{}\n\n{}", LESSON_RULES, LESSON_SCHEMA),
        }
    }

    /// Whether the oracle may answer with clarifying questions
    pub fn allows_clarification(self) -> bool {
        !matches!(self, PromptVariant::SingleLesson)
    }
}

/// System instruction for the header (metadata) call
pub const HEADER_SYSTEM_PROMPT: &str = r#"You read the opening pages of a study guide and identify its study metadata.
Return ONLY a JSON object with exactly these fields:
{"title": "study title", "description": "one or two sentence summary or null", "author": "author name or null"}
Do not describe weeks, days or questions. No markdown, no explanations."#;

/// Builds the user message for an extraction call
pub struct PromptBuilder<'a> {
    text: &'a str,
    transcript: &'a [AnsweredQuestion],
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder over the document (or segment) text
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            transcript: &[],
        }
    }

    /// Include answers to earlier clarifying questions
    pub fn with_transcript(mut self, transcript: &'a [AnsweredQuestion]) -> Self {
        self.transcript = transcript;
        self
    }

    /// Build the user message
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(self.text.len() + 256);

        if !self.transcript.is_empty() {
            prompt.push_str("Clarifications already provided by the user:\n");
            for pair in self.transcript {
                prompt.push_str(&format!("Q: {}\nA: {}\n", pair.question, pair.answer));
            }
            prompt.push_str("\nUse these answers. Do not ask these questions again.\n\n");
        }

        prompt.push_str("Document text:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const STUDY_ROLE: &str = r#"You convert a study guide document into structured JSON.
The document is organized into weeks (sometimes called lessons, sessions or chapters).
Each week contains days, and each day contains questions for the reader."#;

const FULL_RULES: &str = r#"Rules:
- Include EVERY week, day and question in document order
- Copy question text verbatim, including sub-parts
- Copy each day's teaching content verbatim into "content"
- Put any scripture passage for the day in "scriptureReference" (e.g. "John 3:16-21")
- questionType is "reflection" for personal application prompts, "multiple_choice" when choices are listed, otherwise "text""#;

const CONCISE_RULES: &str = r#"Rules (the document is long; keep the output compact):
- Include EVERY week, day and question in document order; never skip entries
- Summarize each day's "content" in at most 100 characters
- If a question is longer than 150 characters, truncate it to 150 characters
- Put any scripture passage for the day in "scriptureReference"
- questionType is "reflection" for personal application prompts, "multiple_choice" when choices are listed, otherwise "text""#;

const STUDY_SCHEMA: &str = r#"Output schema:
{
  "title": "study title",
  "description": "short description or null",
  "author": "author or null",
  "weeks": [
    {
      "weekNumber": 1,
      "title": "week title",
      "description": "week overview or null",
      "days": [
        {
          "dayNumber": 1,
          "title": "day title",
          "content": "day content or null",
          "scriptureReference": "reference or null",
          "questions": [
            {"questionText": "question", "questionType": "text", "order": 1}
          ]
        }
      ]
    }
  ]
}"#;

const CLARIFICATION_RULES: &str = r#"If the document is too ambiguous to structure (for example you cannot tell where weeks or days begin), do not guess. Instead return:
{
  "needsClarification": true,
  "questions": [
    {"id": "q1", "question": "what you need to know", "context": "why you are asking", "options": ["option A", "option B"]}
  ]
}
"options" may be omitted for open questions. Ask only what is necessary."#;

const LESSON_RULES: &str = r#"You convert ONE lesson of a study guide into structured JSON.
The text below is a single week (lesson) containing days, and each day contains questions.
Rules:
- Return exactly one week object, not a study wrapper
- Include EVERY day and question in order
- Copy question text verbatim; summarize day content if it is very long
- Put any scripture passage for the day in "scriptureReference"
- questionType is "reflection" for personal application prompts, "multiple_choice" when choices are listed, otherwise "text""#;

const LESSON_SCHEMA: &str = r#"Output schema:
{
  "weekNumber": 1,
  "title": "week title",
  "description": "week overview or null",
  "days": [
    {
      "dayNumber": 1,
      "title": "day title",
      "content": "day content or null",
      "scriptureReference": "reference or null",
      "questions": [
        {"questionText": "question", "questionType": "text", "order": 1}
      ]
    }
  ]
}"#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Remember: Return ONLY valid JSON, no markdown code blocks, no explanations.";
