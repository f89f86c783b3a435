//! Program submission subsystem
//!
//! Upload -> extract -> validate files -> parse metadata -> validate
//! metadata -> transfer -> persist, with temp artifacts removed on every exit.

pub mod form;
pub mod metadata;
pub mod pipeline;
pub mod validator;
pub mod zip_extractor;

pub use form::{validate_form, FieldError, ProgramForm};
pub use metadata::{MetadataError, ProgramTextDetails};
pub use pipeline::{
    Rejection, SubmissionError, SubmissionOutcome, SubmissionPipeline, SubmissionRequest,
    SubmissionSettings, SubmissionState,
};
pub use zip_extractor::{ExtractError, ExtractedFileSet, UploadedArchive, ZipExtractor};

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Build an in-memory zip; names ending in `/` become directory entries
    pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
        }

        writer.finish().unwrap().into_inner()
    }
}
