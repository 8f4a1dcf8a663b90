//! Document segmentation by lesson headers
//!
//! Splits a long document into per-lesson chunks using an ordered list of
//! header patterns. The first pattern that yields at least two non-trivial
//! parts wins; if none does, the document comes back as a single segment.

use crate::text::char_len;
use once_cell::sync::Lazy;
use regex::Regex;

const NUMBER: &str = r"(?:\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)";

/// A named header pattern
#[derive(Debug, Clone)]
pub struct HeaderPattern {
    /// Short name used in logs
    pub name: &'static str,
    regex: Regex,
}

impl HeaderPattern {
    /// Build a pattern; `regex` must match at the start of a header line
    pub fn new(name: &'static str, regex: Regex) -> Self {
        Self { name, regex }
    }

    /// Pattern for lines like "Lesson One:" or "## Week 3 -"
    fn keyword(name: &'static str, keyword: &str) -> Self {
        let pattern = format!(
            r"(?im)^[ \t#*]*{}[ \t]+{}\b[ \t]*(?:[:.\-–—]|$)",
            keyword, NUMBER
        );
        let regex = Regex::new(&pattern).expect("valid header pattern");
        Self::new(name, regex)
    }
}

/// Header patterns in priority order
static DEFAULT_PATTERNS: Lazy<Vec<HeaderPattern>> = Lazy::new(|| {
    vec![
        HeaderPattern::keyword("lesson", "lesson"),
        HeaderPattern::keyword("week", "week"),
        HeaderPattern::keyword("session", "session"),
        HeaderPattern::keyword("chapter", "chapter"),
        HeaderPattern::keyword("unit", "unit"),
    ]
});

/// A contiguous slice of the document assigned to one extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the document
    pub index: usize,
    /// Segment text
    pub text: String,
}

/// Outcome of segmenting one document
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Name of the pattern that produced the split, if any
    pub pattern: Option<&'static str>,
    /// Segments in document order
    pub segments: Vec<Segment>,
}

impl Segmentation {
    /// Whether the document was actually split
    pub fn is_split(&self) -> bool {
        self.segments.len() >= 2
    }
}

/// Splits documents on lesson headers
pub struct DocumentSegmenter {
    patterns: Vec<HeaderPattern>,
    min_segment_chars: usize,
}

impl DocumentSegmenter {
    /// Create a segmenter with the default header patterns
    pub fn new(min_segment_chars: usize) -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
            min_segment_chars,
        }
    }

    /// Replace the header patterns (tried in the given order)
    pub fn with_patterns(mut self, patterns: Vec<HeaderPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Segment the document
    ///
    /// Text before the first header becomes the first part when it is long
    /// enough to count.
    pub fn segment(&self, text: &str) -> Segmentation {
        for pattern in &self.patterns {
            let parts = split_on_pattern(text, &pattern.regex, self.min_segment_chars);
            if parts.len() >= 2 {
                return Segmentation {
                    pattern: Some(pattern.name),
                    segments: into_segments(parts),
                };
            }
        }

        Segmentation {
            pattern: None,
            segments: vec![Segment {
                index: 0,
                text: text.to_string(),
            }],
        }
    }
}

/// Split `text` before every header match, keeping non-trivial parts
///
/// The text ahead of the first match is a part like any other.
pub fn split_on_pattern<'t>(text: &'t str, regex: &Regex, min_chars: usize) -> Vec<&'t str> {
    let mut bounds: Vec<usize> = regex.find_iter(text).map(|m| m.start()).collect();
    if bounds.is_empty() {
        return Vec::new();
    }
    if bounds[0] > 0 {
        bounds.insert(0, 0);
    }

    bounds
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = bounds.get(i + 1).copied().unwrap_or(text.len());
            text[start..end].trim()
        })
        .filter(|part| char_len(part) > min_chars)
        .collect()
}

fn into_segments(parts: Vec<&str>) -> Vec<Segment> {
    parts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Segment {
            index,
            text: text.to_string(),
        })
        .collect()
}
