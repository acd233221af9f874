use std::path::Path;

use crate::error::{AdvError, Result};

/// Source-document text service.
///
/// The batch treats text extraction as an external collaborator; swapping
/// the implementation keeps the pipeline testable without real PDFs.
pub trait DocumentReader {
    /// Return the full text of the document at `path`.
    fn read_text(&self, path: &Path) -> Result<String>;
}

/// PDF text extractor.
pub struct PdfReader;

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentReader for PdfReader {
    fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| AdvError::Extraction {
            path: path.to_string_lossy().into(),
            detail: format!("PDF extraction error: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let reader = PdfReader::new();
        let err = reader.read_text(Path::new("/nonexistent/form.pdf")).unwrap_err();
        assert!(matches!(err, AdvError::Io(_)));
    }

    #[test]
    fn non_pdf_bytes_fail_extraction() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("not_a_pdf.pdf");
        std::fs::write(&path, b"plain text, not a pdf").unwrap();
        let err = PdfReader::new().read_text(&path).unwrap_err();
        assert!(matches!(err, AdvError::Extraction { .. }));
    }
}
