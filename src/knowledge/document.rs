//! Text extraction from uploaded files.

use crate::error::{EngageError, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("Invalid regex"));
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("Invalid regex"));

/// A file received through a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// MIME type from the upload, falling back to a guess from the file name.
    pub fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.filename)
                    .first_or_octet_stream()
                    .to_string()
            })
    }
}

/// Extract plain text according to the declared document type.
///
/// PDFs are parsed on the blocking pool; everything else is read as UTF-8, replacing
/// invalid sequences.
pub async fn extract_text(file: &UploadedFile, document_type: &str) -> Result<String> {
    let is_pdf = document_type.eq_ignore_ascii_case("pdf") || file.mime_type() == "application/pdf";
    if !is_pdf {
        return Ok(String::from_utf8_lossy(&file.data).into_owned());
    }

    let data = file.data.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| EngageError::Document(format!("PDF extraction aborted: {}", e)))?
        .map_err(|e| EngageError::Document(format!("Could not read PDF: {}", e)))?;

    let text = normalize_whitespace(&text);
    if text.is_empty() {
        return Err(EngageError::Document(
            "No text could be extracted from this PDF".to_string(),
        ));
    }

    debug!("Extracted {} characters from {}", text.len(), file.filename);
    Ok(text)
}

/// Collapse extraction artifacts: runs of blank lines become one paragraph break and runs
/// of spaces or tabs become a single space.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    INLINE_SPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_guess() {
        let file = UploadedFile {
            filename: "handbook.pdf".to_string(),
            content_type: None,
            data: Vec::new(),
        };
        assert_eq!(file.mime_type(), "application/pdf");
    }

    #[test]
    fn test_normalize_whitespace() {
        let raw = "  Page 1\r\n\r\n\r\n\n  Opening\t\thours:   9 to 5 \n";
        assert_eq!(normalize_whitespace(raw), "Page 1\n\n Opening hours: 9 to 5");
    }

    #[tokio::test]
    async fn test_text_file_lossy_decode() {
        let file = UploadedFile {
            filename: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            data: vec![b'h', b'i', 0xff],
        };
        let text = extract_text(&file, "text").await.unwrap();
        assert!(text.starts_with("hi"));
    }

    #[tokio::test]
    async fn test_invalid_pdf_rejected() {
        let file = UploadedFile {
            filename: "broken.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            data: b"not a pdf".to_vec(),
        };
        assert!(matches!(
            extract_text(&file, "pdf").await,
            Err(EngageError::Document(_))
        ));
    }
}
