//! Text extraction for uploaded documents

use crate::crawler::extract_page;
use crate::processor::error::ProcessError;
use tracing::debug;

/// Turn an uploaded file into plain text according to its content type.
///
/// Plain text and markdown are kept verbatim, HTML is reduced to the visible body
/// text, and any other type is decoded as UTF-8 with invalid sequences replaced.
pub fn extract_document_text(content_type: &str, bytes: &[u8]) -> Result<String, ProcessError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let raw = String::from_utf8_lossy(bytes);

    let text = match essence.as_str() {
        "text/html" | "application/xhtml+xml" => extract_page(&raw, false, 0)
            .map(|page| page.text)
            .map_err(|e| ProcessError::Document(e.to_string()))?,
        "text/plain" | "text/markdown" | "text/x-markdown" => raw.into_owned(),
        other => {
            debug!("No extractor for {}, decoding as text", other);
            raw.into_owned()
        }
    };

    Ok(text)
}
