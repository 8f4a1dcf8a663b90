//! Sources of answers to clarifying questions.

use crate::error::{CliError, Result};
use crate::output::Formatter;
use lectio_extractor::ClarificationRequest;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::HashMap;

/// Supplies answers for one clarification round.
pub trait AnswerSource {
    /// Answers keyed by question id, or `None` to stop and report the questions.
    fn collect(&mut self, request: &ClarificationRequest) -> Result<Option<HashMap<String, String>>>;
}

/// Never answers; the questions are reported to the caller.
#[derive(Debug, Default)]
pub struct NonInteractive;

impl AnswerSource for NonInteractive {
    fn collect(&mut self, _request: &ClarificationRequest) -> Result<Option<HashMap<String, String>>> {
        Ok(None)
    }
}

/// Prompts for each answer on the terminal.
pub struct TerminalAnswers {
    editor: DefaultEditor,
    formatter: Formatter,
}

impl TerminalAnswers {
    /// Create a prompt session.
    pub fn new(formatter: Formatter) -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            formatter,
        })
    }
}

impl AnswerSource for TerminalAnswers {
    fn collect(&mut self, request: &ClarificationRequest) -> Result<Option<HashMap<String, String>>> {
        println!(
            "{}",
            self.formatter.info(&format!(
                "The document needs clarification (round {})",
                request.round
            ))
        );

        let mut answers = HashMap::new();
        for (index, question) in request.questions.iter().enumerate() {
            println!();
            println!("{}", self.formatter.question(index + 1, question));

            let line = match self.editor.readline("> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    return Err(CliError::Interrupted);
                }
                Err(e) => return Err(e.into()),
            };
            let answer = resolve_answer(&line, question.options.as_deref());
            if !answer.is_empty() {
                answers.insert(question.id.clone(), answer);
            }
        }
        println!();

        Ok(Some(answers))
    }
}

/// Interpret a typed answer.
///
/// A number within the option list selects that option (1-based); anything
/// else is taken as free text.
pub fn resolve_answer(input: &str, options: Option<&[String]>) -> String {
    let input = input.trim();
    if let (Some(options), Ok(choice)) = (options, input.parse::<usize>()) {
        if let Some(option) = choice.checked_sub(1).and_then(|i| options.get(i)) {
            return option.clone();
        }
    }
    input.to_string()
}
