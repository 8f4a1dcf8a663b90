//! Document loading.
//!
//! The pipeline only accepts plain text, so decoding problems are reported
//! here before any oracle call is made.

use crate::error::{CliError, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a study guide as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| CliError::UnreadableDocument {
        path: path.to_path_buf(),
        reason: format!("not UTF-8 text ({})", e.utf8_error()),
    })?;

    if text.trim().is_empty() {
        return Err(CliError::EmptyDocument(path.to_path_buf()));
    }

    debug!("Read {} ({} chars)", path.display(), lectio_extractor::char_len(&text));
    Ok(text)
}
