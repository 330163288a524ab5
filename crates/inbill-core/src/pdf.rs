//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::debug;

use crate::error::PdfError;

/// Extract the text layer from PDF bytes.
///
/// Oversized data is rejected before any parsing; `max_size` of zero
/// disables the guard. PDFs encrypted with an empty password are decrypted
/// transparently, anything needing a real password is refused.
pub fn extract_text(data: &[u8], max_size: usize) -> Result<String, PdfError> {
    if max_size > 0 && data.len() > max_size {
        return Err(PdfError::TooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    // Handle PDFs with empty password encryption
    let raw = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
        decrypted
    } else {
        data.to_vec()
    };

    let text = pdf_extract::extract_text_from_mem(&raw)
        .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
    debug!("Extracted {} chars of text from {} byte PDF", text.len(), data.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_guard() {
        let data = vec![0u8; 1024];
        let err = extract_text(&data, 512).unwrap_err();
        assert!(matches!(err, PdfError::TooLarge { size: 1024, max: 512 }));
    }

    #[test]
    fn test_size_guard_disabled_with_zero() {
        // zero max means unlimited; garbage then fails at parse, not size
        let err = extract_text(b"not a pdf", 0).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = extract_text(b"%PDF-1.7 truncated", 1 << 20).unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }
}
