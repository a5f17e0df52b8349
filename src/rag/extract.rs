//! Text extraction from uploaded document bytes.

use crate::types::{AppError, Result};

/// Turns raw document bytes into plain text suitable for chunking.
pub trait TextExtractor: Send + Sync {
    /// True if this extractor can handle the given MIME content type.
    fn supports(&self, content_type: &str) -> bool;

    fn extract(&self, data: &[u8], content_type: &str) -> Result<String>;
}

/// Extractor for plain-text document formats. Anything that is valid
/// UTF-8 under a text-like content type passes through unchanged.
pub struct PlainTextExtractor;

const TEXT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/javascript",
];

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, content_type: &str) -> bool {
        let base = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        base.starts_with("text/") || TEXT_TYPES.contains(&base.as_str())
    }

    fn extract(&self, data: &[u8], content_type: &str) -> Result<String> {
        if !self.supports(content_type) {
            return Err(AppError::Extraction(format!(
                "unsupported content type: {}",
                content_type
            )));
        }
        let text = std::str::from_utf8(data)
            .map_err(|e| AppError::Extraction(format!("document is not valid UTF-8: {}", e)))?;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_text_types() {
        let extractor = PlainTextExtractor;
        assert!(extractor.supports("text/plain"));
        assert!(extractor.supports("text/markdown"));
        assert!(extractor.supports("text/plain; charset=utf-8"));
        assert!(extractor.supports("application/json"));
        assert!(!extractor.supports("application/pdf"));
        assert!(!extractor.supports("image/png"));
    }

    #[test]
    fn test_extract_passes_utf8_through() {
        let extractor = PlainTextExtractor;
        let text = extractor.extract("héllo wörld".as_bytes(), "text/plain").unwrap();
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn test_extract_rejects_invalid_utf8() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract(&[0xff, 0xfe, 0x00], "text/plain").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_extract_rejects_binary_content_type() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract(b"%PDF-1.4", "application/pdf").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
