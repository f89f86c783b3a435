//! Program metadata file parsing
//!
//! The metadata entry is a line-oriented text file:
//!
//! ```text
//! # comment
//! name = Foo
//! description: A program that does foo
//! icon128 = icons/foo-128.png
//! icon512 = icons/foo-512.png
//! ```
//!
//! The first `=` or `:` on a line separates key from value. Keys are
//! case-insensitive, unknown keys are ignored, blank lines and lines starting
//! with `#` or `!` are skipped.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Metadata parse errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The archive had no metadata entry
    #[error("Metadata file is absent from the archive")]
    Absent,

    /// The metadata entry exists but its content is not valid
    #[error("Malformed metadata at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// The metadata entry could not be read
    #[error("Failed to read metadata file: {0}")]
    Io(#[from] io::Error),
}

/// Details read from the metadata entry of a submitted archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgramTextDetails {
    pub name: String,
    pub description: String,
    pub icon128: Option<String>,
    pub icon512: Option<String>,
}

/// Parse the metadata file, if the archive contained one
pub fn parse(path: Option<&Path>) -> Result<ProgramTextDetails, MetadataError> {
    let path = path.ok_or(MetadataError::Absent)?;
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|e| MetadataError::Malformed {
        line: line_of_offset(e.as_bytes(), e.utf8_error().valid_up_to()),
        reason: "not valid UTF-8".to_string(),
    })?;

    parse_str(&content)
}

/// Parse metadata text
pub fn parse_str(content: &str) -> Result<ProgramTextDetails, MetadataError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut details = ProgramTextDetails::default();
    let mut seen: Vec<String> = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let separator = line
            .find(['=', ':'])
            .ok_or_else(|| malformed(line_number, "missing '=' or ':' separator"))?;
        let key = line[..separator].trim().to_ascii_lowercase();
        let value = line[separator + 1..].trim();

        if key.is_empty() {
            return Err(malformed(line_number, "empty key"));
        }

        let is_known = matches!(key.as_str(), "name" | "description" | "icon128" | "icon512");
        if is_known {
            if seen.contains(&key) {
                return Err(malformed(line_number, &format!("duplicate key '{}'", key)));
            }
            seen.push(key.clone());
        }

        match key.as_str() {
            "name" => details.name = value.to_string(),
            "description" => details.description = value.to_string(),
            "icon128" => details.icon128 = non_empty(value),
            "icon512" => details.icon512 = non_empty(value),
            _ => tracing::debug!("Ignoring unknown metadata key '{}'", key),
        }
    }

    Ok(details)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn malformed(line: usize, reason: &str) -> MetadataError {
    MetadataError::Malformed {
        line,
        reason: reason.to_string(),
    }
}

/// 1-based line number containing byte `offset`
fn line_of_offset(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset.min(bytes.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
