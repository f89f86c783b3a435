//! Content validators run after extraction
//!
//! - [`has_empty_files`]: rejects archives with zero-length files
//! - [`is_valid_metadata`]: required metadata fields are present

use super::metadata::ProgramTextDetails;
use super::zip_extractor::ExtractedFileSet;
use std::fs;
use std::io;

/// True when any extracted regular file has zero length
///
/// Directory entries are not considered.
pub fn has_empty_files(files: &ExtractedFileSet) -> io::Result<bool> {
    for (relative, path) in files.iter() {
        let metadata = fs::metadata(path)?;
        if metadata.is_file() && metadata.len() == 0 {
            tracing::debug!("Extracted file is empty: {}", relative);
            return Ok(true);
        }
    }

    Ok(false)
}

/// True when name and description are non-blank
///
/// Icons are optional; a program may be listed without them.
pub fn is_valid_metadata(details: &ProgramTextDetails) -> bool {
    !details.name.trim().is_empty() && !details.description.trim().is_empty()
}
