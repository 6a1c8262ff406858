//! PDF text extraction.
//!
//! Returns one UTF-8 string per page, in page order. Pages without a text
//! layer come back as empty strings.

use std::path::Path;

use crate::error::{Error, Result};

/// Extract per-page text from PDF bytes.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| Error::Extract(e.to_string()))
}

/// Read a PDF from disk and extract per-page text.
pub fn extract_pages_from_path(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    extract_pages(&bytes)
}
