//! Study module - the nested structure extracted from a document
//!
//! A study is an ordered list of weeks, each an ordered list of days, each an
//! ordered list of questions. The JSON field names match what the oracle is
//! asked to produce (camelCase). Deserialization is deliberately lenient:
//! oracles emit `null`, stringly numbers and unknown enum tags, and none of
//! those should sink an otherwise usable payload.

use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of question asked on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum QuestionType {
    /// Free-form written answer
    #[default]
    Text,
    /// Personal reflection or application prompt
    Reflection,
    /// Question with a fixed set of choices
    MultipleChoice,
}

impl From<Option<String>> for QuestionType {
    fn from(value: Option<String>) -> Self {
        let Some(raw) = value else {
            return QuestionType::Text;
        };
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "reflection" | "reflective" | "application" => QuestionType::Reflection,
            "multiple_choice" | "multiplechoice" | "choice" => QuestionType::MultipleChoice,
            _ => QuestionType::Text,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionType::Text => "text",
            QuestionType::Reflection => "reflection",
            QuestionType::MultipleChoice => "multiple_choice",
        };
        f.write_str(s)
    }
}

/// A single question within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuestion {
    /// The question text
    #[serde(default, deserialize_with = "string_or_empty")]
    pub question_text: String,

    /// Question kind
    #[serde(default)]
    pub question_type: QuestionType,

    /// 1-based position within the parent day
    #[serde(default, deserialize_with = "lenient_number")]
    pub order: u32,
}

impl ParsedQuestion {
    /// Create a question of the given type; `order` is assigned on renumbering
    pub fn new(question_text: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            question_text: question_text.into(),
            question_type,
            order: 0,
        }
    }
}

/// One day of study within a week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDay {
    /// 1-based position within the parent week
    #[serde(default, deserialize_with = "lenient_number")]
    pub day_number: u32,

    /// Day title
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,

    /// Reading or teaching content for the day
    #[serde(default)]
    pub content: Option<String>,

    /// Scripture reference, e.g. "John 3:16-21"
    #[serde(default)]
    pub scripture_reference: Option<String>,

    /// Questions in display order
    #[serde(default, deserialize_with = "vec_or_empty")]
    pub questions: Vec<ParsedQuestion>,
}

impl ParsedDay {
    /// Create an empty day with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            day_number: 0,
            title: title.into(),
            content: None,
            scripture_reference: None,
            questions: Vec::new(),
        }
    }

    /// Append a question and return self
    pub fn with_question(mut self, question: ParsedQuestion) -> Self {
        self.questions.push(question);
        self
    }

    /// Recompute question order to 1..N in list order
    pub fn renumber_questions(&mut self) {
        for (idx, question) in self.questions.iter_mut().enumerate() {
            question.order = position(idx);
        }
    }
}

/// One week (lesson) of a study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedWeek {
    /// 1-based position within the study
    #[serde(default, deserialize_with = "lenient_number")]
    pub week_number: u32,

    /// Week title
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,

    /// Optional overview of the week
    #[serde(default)]
    pub description: Option<String>,

    /// Days in display order
    #[serde(default, deserialize_with = "vec_or_empty")]
    pub days: Vec<ParsedDay>,
}

impl ParsedWeek {
    /// Create an empty week with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            week_number: 0,
            title: title.into(),
            description: None,
            days: Vec::new(),
        }
    }

    /// Append a day and return self
    pub fn with_day(mut self, day: ParsedDay) -> Self {
        self.days.push(day);
        self
    }

    /// Recompute day numbers (and each day's question order) to 1..N
    pub fn renumber_days(&mut self) {
        for (idx, day) in self.days.iter_mut().enumerate() {
            day.day_number = position(idx);
            day.renumber_questions();
        }
    }

    /// Number of questions across all days of this week
    pub fn question_count(&self) -> usize {
        self.days.iter().map(|d| d.questions.len()).sum()
    }

    /// Whether this fragment carries any structure worth keeping
    pub fn has_content(&self) -> bool {
        !self.days.is_empty()
    }
}

/// A complete study extracted from one document
///
/// Once extraction succeeds a study has at least one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStudy {
    /// Study title
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Optional author
    #[serde(default)]
    pub author: Option<String>,

    /// Weeks in display order
    #[serde(default, deserialize_with = "vec_or_empty")]
    pub weeks: Vec<ParsedWeek>,
}

impl ParsedStudy {
    /// Create an empty study
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            author: None,
            weeks: Vec::new(),
        }
    }

    /// Recompute week, day and question numbering to contiguous 1..N
    ///
    /// # Examples
    ///
    /// ```
    /// use lectio_domain::{ParsedStudy, ParsedWeek};
    ///
    /// let mut study = ParsedStudy::new("Romans");
    /// let mut week = ParsedWeek::new("Grace");
    /// week.week_number = 7;
    /// study.weeks.push(week);
    /// study.renumber();
    /// assert_eq!(study.weeks[0].week_number, 1);
    /// ```
    pub fn renumber(&mut self) {
        for (idx, week) in self.weeks.iter_mut().enumerate() {
            week.week_number = position(idx);
            week.renumber_days();
        }
    }

    /// Clean up oracle output and renumber
    ///
    /// Drops questions with blank text, fills blank week and day titles with
    /// positional defaults, then renumbers everything.
    pub fn normalize(&mut self) {
        for (week_idx, week) in self.weeks.iter_mut().enumerate() {
            if week.title.trim().is_empty() {
                week.title = format!("Week {}", week_idx + 1);
            }
            for (day_idx, day) in week.days.iter_mut().enumerate() {
                if day.title.trim().is_empty() {
                    day.title = format!("Day {}", day_idx + 1);
                }
                day.questions.retain(|q| !q.question_text.trim().is_empty());
            }
        }
        self.renumber();
    }

    /// Whether at least one week was extracted
    pub fn has_weeks(&self) -> bool {
        !self.weeks.is_empty()
    }

    /// Number of days across all weeks
    pub fn total_days(&self) -> usize {
        self.weeks.iter().map(|w| w.days.len()).sum()
    }

    /// Number of questions across all weeks and days
    pub fn total_questions(&self) -> usize {
        self.weeks.iter().map(ParsedWeek::question_count).sum()
    }
}

fn position(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(u64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Numbers are recomputed anyway, so anything unreadable becomes 0
fn lenient_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LenientNumber>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientNumber::Int(n)) => u32::try_from(n).unwrap_or(0),
        Some(LenientNumber::Float(f)) if f >= 0.0 && f <= u32::MAX as f64 => f as u32,
        Some(LenientNumber::Text(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn vec_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_week() -> impl Strategy<Value = ParsedWeek> {
        (any::<u32>(), prop::collection::vec((any::<u32>(), 0usize..5), 0..6)).prop_map(
            |(week_number, days)| {
                let mut week = ParsedWeek::new("w");
                week.week_number = week_number;
                for (day_number, questions) in days {
                    let mut day = ParsedDay::new("d");
                    day.day_number = day_number;
                    for q in 0..questions {
                        let mut question = ParsedQuestion::new(format!("q{}", q), QuestionType::Text);
                        question.order = day_number.wrapping_add(q as u32);
                        day.questions.push(question);
                    }
                    week.days.push(day);
                }
                week
            },
        )
    }

    proptest! {
        /// Property: renumbering yields 1..N at every level, preserving relative order
        #[test]
        fn test_renumber_is_contiguous(weeks in prop::collection::vec(arb_week(), 0..8)) {
            let day_counts: Vec<usize> = weeks.iter().map(|w| w.days.len()).collect();
            let mut study = ParsedStudy::new("s");
            study.weeks = weeks;
            study.renumber();

            for (w_idx, week) in study.weeks.iter().enumerate() {
                prop_assert_eq!(week.week_number as usize, w_idx + 1);
                prop_assert_eq!(week.days.len(), day_counts[w_idx]);
                for (d_idx, day) in week.days.iter().enumerate() {
                    prop_assert_eq!(day.day_number as usize, d_idx + 1);
                    for (q_idx, question) in day.questions.iter().enumerate() {
                        prop_assert_eq!(question.order as usize, q_idx + 1);
                        prop_assert_eq!(&question.question_text, &format!("q{}", q_idx));
                    }
                }
            }
        }

        /// Property: dropping arbitrary weeks then renumbering leaves no gaps
        #[test]
        fn test_renumber_after_removal(count in 1usize..20, drop_mask in any::<u32>()) {
            let mut study = ParsedStudy::new("s");
            for i in 0..count {
                let mut week = ParsedWeek::new(format!("w{}", i));
                week.week_number = (i as u32) * 3 + 1;
                study.weeks.push(week);
            }
            let mut idx = 0;
            study.weeks.retain(|_| {
                let keep = drop_mask & (1 << (idx % 32)) == 0;
                idx += 1;
                keep
            });
            let survivors: Vec<String> = study.weeks.iter().map(|w| w.title.clone()).collect();
            study.renumber();

            let numbers: Vec<u32> = study.weeks.iter().map(|w| w.week_number).collect();
            let expected: Vec<u32> = (1..=survivors.len() as u32).collect();
            prop_assert_eq!(numbers, expected);
            let titles: Vec<String> = study.weeks.iter().map(|w| w.title.clone()).collect();
            prop_assert_eq!(titles, survivors);
        }
    }
}
