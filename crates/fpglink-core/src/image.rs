//! Memory-image ranges — what a loadable executable section looks like to
//! the transfer engine.

use bytes::Bytes;

/// One loadable range of the device memory image.
///
/// `content = None` marks a BSS-like range: there are no stored bytes, the
/// range is synthesized as zeros on upload and compared against zeros on
/// verify.
#[derive(Debug, Clone)]
pub struct MemoryRange {
    start: u64,
    end: u64,
    content: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("empty memory range at {start:#x}")]
    EmptyRange { start: u64 },

    #[error("range [{start:#x}, {end:#x}) spans {span} bytes but content holds {len}")]
    LengthMismatch { start: u64, end: u64, span: u64, len: usize },
}

impl MemoryRange {
    /// `end` is exclusive and must be greater than `start`; when content is
    /// present its length must equal the span.
    pub fn new(start: u64, end: u64, content: Option<Bytes>) -> Result<Self, ImageError> {
        if end <= start {
            return Err(ImageError::EmptyRange { start });
        }
        if let Some(bytes) = &content {
            if bytes.len() as u64 != end - start {
                return Err(ImageError::LengthMismatch {
                    start,
                    end,
                    span: end - start,
                    len: bytes.len(),
                });
            }
        }
        Ok(Self { start, end, content })
    }

    /// Range carrying concrete bytes, sized by the content.
    pub fn with_content(start: u64, content: Bytes) -> Result<Self, ImageError> {
        let end = start + content.len() as u64;
        Self::new(start, end, Some(content))
    }

    /// Zero-filled range (no stored bytes).
    pub fn zeroed(start: u64, end: u64) -> Result<Self, ImageError> {
        Self::new(start, end, None)
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Span in bytes. Always non-zero — `end > start` is a construction
    /// invariant.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Stored bytes, or None for a zero-filled range.
    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}
