//! Submission form fields and their validation
//!
//! Field errors are reported as message keys and rendered inline on the
//! form; the pipeline only runs once the form is clean.

use super::zip_extractor::UploadedArchive;
use softstore_common::db::Category;

/// Longest accepted program name
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted program description
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Form field names as sent by the submission page
pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_CATEGORY_ID: &str = "categoryId";
pub const FIELD_FILE: &str = "file";

/// Raw submission form
#[derive(Debug, Clone, Default)]
pub struct ProgramForm {
    pub name: String,
    pub description: String,
    /// `None` when the field was missing or not an integer
    pub category_id: Option<i64>,
    pub file: Option<UploadedArchive>,
}

/// A single field error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message_key: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message_key: &'static str) -> Self {
        Self { field, message_key }
    }
}

/// Validate the form against the known categories and upload limit
pub fn validate_form(
    form: &ProgramForm,
    categories: &[Category],
    max_upload_size_bytes: u64,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new(FIELD_NAME, "error.name.required"));
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(FIELD_NAME, "error.name.too.long"));
    } else if !is_safe_directory_name(name) {
        // The name becomes the storage directory of the program
        errors.push(FieldError::new(FIELD_NAME, "error.name.invalid"));
    }

    let description = form.description.trim();
    if description.is_empty() {
        errors.push(FieldError::new(FIELD_DESCRIPTION, "error.description.required"));
    } else if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        errors.push(FieldError::new(FIELD_DESCRIPTION, "error.description.too.long"));
    }

    match form.category_id {
        None => errors.push(FieldError::new(FIELD_CATEGORY_ID, "error.category.required")),
        Some(id) if !categories.iter().any(|c| c.id == id) => {
            errors.push(FieldError::new(FIELD_CATEGORY_ID, "error.category.unknown"))
        }
        Some(_) => {}
    }

    match &form.file {
        None => errors.push(FieldError::new(FIELD_FILE, "error.file.required")),
        Some(file) if file.is_empty() => {
            errors.push(FieldError::new(FIELD_FILE, "error.file.empty"))
        }
        Some(file) if file.len() as u64 > max_upload_size_bytes => {
            errors.push(FieldError::new(FIELD_FILE, "error.file.too.large"))
        }
        Some(file) if !file.file_name().to_ascii_lowercase().ends_with(".zip") => {
            errors.push(FieldError::new(FIELD_FILE, "error.file.not.zip"))
        }
        Some(_) => {}
    }

    errors
}

/// A name usable as a single directory component on any platform
pub fn is_safe_directory_name(name: &str) -> bool {
    const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    name != "."
        && name != ".."
        && !name.ends_with('.')
        && !name.chars().any(|c| c.is_control() || FORBIDDEN.contains(&c))
}
