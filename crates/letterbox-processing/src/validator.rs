//! Structural checks run on an upload before any network call.

/// How far into the file the `%PDF-` signature may appear.
const SIGNATURE_WINDOW: usize = 1024;
/// How far from the end of the file the `%%EOF` marker may appear.
const EOF_WINDOW: usize = 1024;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
const PDF_EOF_MARKER: &[u8] = b"%%EOF";

/// Why a file failed structural validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PdfCheckError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooBig { size: usize, max: usize },

    #[error("File is not a PDF")]
    WrongType,

    #[error("PDF has no end-of-file marker")]
    Malformed,
}

/// Letter file validator
///
/// Checks run in a fixed order and the first failure wins: size, then
/// signature, then the trailing end-of-file marker.
#[derive(Debug, Clone)]
pub struct LetterValidator {
    max_file_size: usize,
}

impl LetterValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate an upload. `declared_size` is what the client announced; the
    /// larger of it and the actual length is checked.
    pub fn validate(&self, data: &[u8], declared_size: usize) -> Result<(), PdfCheckError> {
        self.validate_file_size(declared_size.max(data.len()))?;
        validate_signature(data)?;
        validate_trailer(data)?;
        Ok(())
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), PdfCheckError> {
        if size > self.max_file_size {
            return Err(PdfCheckError::TooBig {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// `%PDF-` within the first kilobyte, tolerating leading junk.
fn validate_signature(data: &[u8]) -> Result<(), PdfCheckError> {
    let head = &data[..data.len().min(SIGNATURE_WINDOW)];
    if contains(head, PDF_SIGNATURE) {
        Ok(())
    } else {
        Err(PdfCheckError::WrongType)
    }
}

/// `%%EOF` within the last kilobyte, ignoring trailing whitespace and NULs.
fn validate_trailer(data: &[u8]) -> Result<(), PdfCheckError> {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace() && *b != 0)
        .map_or(0, |i| i + 1);
    let trimmed = &data[..end];
    let tail = &trimmed[trimmed.len().saturating_sub(EOF_WINDOW)..];
    if contains(tail, PDF_EOF_MARKER) {
        Ok(())
    } else {
        Err(PdfCheckError::Malformed)
    }
}
