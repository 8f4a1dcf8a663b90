//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use lectio_domain::ClarifyingQuestion;
use lectio_extractor::{ClarificationRequest, ExtractedStudy, ExtractionResult, Fidelity};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// The selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a pipeline outcome.
    pub fn format_result(&self, result: &ExtractionResult) -> Result<String> {
        match (self.format, result) {
            (OutputFormat::Json, _) => Ok(serde_json::to_string_pretty(&result.to_response())?),
            (_, ExtractionResult::Success(extracted)) => self.format_study(extracted),
            (_, ExtractionResult::NeedsClarification(request)) => Ok(self.format_questions(request)),
            (_, ExtractionResult::Failure(e)) => Ok(self.error(&e.to_string())),
        }
    }

    /// Format an extracted study.
    pub fn format_study(&self, extracted: &ExtractedStudy) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(
                &ExtractionResult::Success(extracted.clone()).to_response(),
            )?),
            OutputFormat::Table => Ok(self.format_study_table(extracted)),
            OutputFormat::Quiet => Ok(format!(
                "{} {} {}",
                extracted.study.weeks.len(),
                extracted.study.total_days(),
                extracted.study.total_questions()
            )),
        }
    }

    fn format_study_table(&self, extracted: &ExtractedStudy) -> String {
        let study = &extracted.study;

        let mut builder = Builder::default();
        builder.push_record(["Week", "Title", "Days", "Questions"]);
        for week in &study.weeks {
            builder.push_record([
                week.week_number.to_string(),
                week.title.clone(),
                week.days.len().to_string(),
                week.question_count().to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![self.colorize(&study.title, "cyan")];
        if let Some(author) = &study.author {
            lines.push(format!("by {}", author));
        }
        lines.push(table.to_string());
        lines.push(self.success(&format!(
            "{} weeks, {} days, {} questions ({} strategy, {} ms)",
            study.weeks.len(),
            study.total_days(),
            study.total_questions(),
            extracted.metadata.strategy,
            extracted.metadata.processing_time_ms
        )));

        if extracted.fidelity == Fidelity::Salvaged {
            lines.push(self.warning("Some oracle output was truncated and repaired; review the result"));
        }
        if extracted.metadata.segments_dropped > 0 {
            lines.push(self.warning(&format!(
                "{} of {} lessons could not be extracted",
                extracted.metadata.segments_dropped, extracted.metadata.segments_total
            )));
        }

        lines.join("\n")
    }

    /// Format outstanding clarifying questions.
    pub fn format_questions(&self, request: &ClarificationRequest) -> String {
        let mut lines = vec![self.warning(&format!(
            "{} clarifying question(s), round {}",
            request.questions.len(),
            request.round
        ))];
        for (index, question) in request.questions.iter().enumerate() {
            lines.push(self.question(index + 1, question));
        }
        lines.join("\n")
    }

    /// Format one question with its context and numbered options.
    pub fn question(&self, number: usize, question: &ClarifyingQuestion) -> String {
        let mut lines = vec![format!(
            "{} {}",
            self.colorize(&format!("[{}]", number), "magenta"),
            question.question
        )];
        if !question.context.is_empty() {
            lines.push(format!("    {}", question.context));
        }
        if let Some(options) = &question.options {
            for (i, option) in options.iter().enumerate() {
                lines.push(format!("    {}) {}", i + 1, option));
            }
        }
        lines.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}
