//! Salvage JSON cut off at the oracle's output ceiling
//!
//! Repair only ever removes an incomplete tail and closes the structures that
//! were left open. It never invents a value: anything after the last point
//! where the document was structurally complete is dropped.

use crate::parser::extract_truncated_json;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Structural state of a JSON prefix
#[derive(Debug, Default)]
struct Scan {
    /// Open `{` / `[` in nesting order
    stack: Vec<char>,
    in_string: bool,
    /// Byte offset of the last position where the prefix can be closed
    safe_cut: Option<usize>,
    /// A closer that did not match its opener
    corrupt: bool,
}

impl Scan {
    fn run(json: &str) -> Self {
        let mut scan = Scan::default();
        let mut escaped = false;

        for (i, c) in json.char_indices() {
            if scan.in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    scan.in_string = false;
                }
                continue;
            }

            match c {
                '"' => scan.in_string = true,
                // An entry that has only been opened is not complete yet
                '{' | '[' => scan.stack.push(c),
                '}' | ']' => {
                    let expected = if c == '}' { '{' } else { '[' };
                    if scan.stack.pop() != Some(expected) {
                        scan.corrupt = true;
                        return scan;
                    }
                    scan.safe_cut = Some(i + 1);
                }
                // Everything before a separator is a complete member
                ',' => scan.safe_cut = Some(i),
                _ => {}
            }
        }

        scan
    }

    fn is_open(&self) -> bool {
        !self.stack.is_empty() || self.in_string
    }
}

/// Close a truncated JSON document
///
/// The cut falls after the last complete member, so an entry whose first
/// member never finished is dropped together with the separator before it.
/// Returns `None` when the text is not a truncated document (nothing left
/// open, or mismatched closers) or when nothing complete precedes the cut.
pub fn repair_truncated_json(response: &str) -> Option<String> {
    let json = extract_truncated_json(response);
    let scan = Scan::run(json);
    if scan.corrupt || !scan.is_open() {
        return None;
    }

    let cut = scan.safe_cut?;
    let prefix = json[..cut].trim_end().trim_end_matches(',');
    let open = Scan::run(prefix).stack;

    let mut repaired = String::with_capacity(prefix.len() + open.len());
    repaired.push_str(prefix);
    for opener in open.iter().rev() {
        repaired.push(if *opener == '{' { '}' } else { ']' });
    }

    debug!(
        "Repaired truncated JSON: dropped {} trailing bytes, closed {} structures",
        json.len() - cut,
        open.len()
    );
    Some(repaired)
}

/// Repair a truncated reply and deserialize it
pub fn recover<T: DeserializeOwned>(response: &str) -> Option<T> {
    let repaired = repair_truncated_json(response)?;
    serde_json::from_str(&repaired).ok()
}
