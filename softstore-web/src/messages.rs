//! User-facing message catalog
//!
//! Handlers and the pipeline refer to messages by key; pages resolve keys to
//! text here. Keys arriving from a query string are only shown when known.

pub const MSG_PROGRAM_ADDED: &str = "msg.program.added";
pub const ERROR_CONTAINS_EMPTY_FILES: &str = "error.contains.empty.files";
pub const ERROR_ZIP_TXT_FILE_FORMAT: &str = "error.zip.txt.file.format";
pub const ERROR_PROCESSING_ZIP: &str = "error.processing.zip";

/// Resolve a message key to display text
pub fn lookup(key: &str) -> Option<&'static str> {
    let text = match key {
        MSG_PROGRAM_ADDED => "Program was added successfully.",
        ERROR_CONTAINS_EMPTY_FILES => "The archive contains empty files.",
        ERROR_ZIP_TXT_FILE_FORMAT => {
            "The archive's info file is missing or has the wrong format (name and description are required)."
        }
        ERROR_PROCESSING_ZIP => "An error occurred while processing the zip file. Please try again.",

        "error.name.required" => "Program name is required.",
        "error.name.too.long" => "Program name is too long.",
        "error.name.invalid" => "Program name contains characters that are not allowed.",
        "error.description.required" => "Description is required.",
        "error.description.too.long" => "Description is too long.",
        "error.category.required" => "Please choose a category.",
        "error.category.unknown" => "The chosen category does not exist.",
        "error.file.required" => "Please choose a zip file to upload.",
        "error.file.empty" => "The uploaded file is empty.",
        "error.file.too.large" => "The uploaded file exceeds the maximum size.",
        "error.file.not.zip" => "Only .zip archives are accepted.",
        _ => return None,
    };
    Some(text)
}

/// Resolve a key, falling back to the key itself
pub fn text(key: &str) -> &str {
    lookup(key).unwrap_or(key)
}
