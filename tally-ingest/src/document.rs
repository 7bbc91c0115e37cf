//! Turning an uploaded document into text a layout rule set can scan.

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::types::StatementDocument;

pub trait DocumentReader: Send + Sync {
    fn read_text(&self, document: &StatementDocument) -> Result<String>;
}

/// Extracts text from textual PDFs with `pdf-extract`; anything else must
/// already be UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextReader;

impl DocumentReader for PdfTextReader {
    fn read_text(&self, document: &StatementDocument) -> Result<String> {
        let text = if document.is_pdf() {
            pdf_extract::extract_text_from_mem(&document.bytes)
                .map_err(|e| anyhow!("extract text from PDF: {e}"))?
        } else {
            std::str::from_utf8(&document.bytes)
                .context("document is neither a PDF nor UTF-8 text")?
                .to_owned()
        };
        debug!("extracted {} chars from {}", text.len(), document.source);
        Ok(text)
    }
}
