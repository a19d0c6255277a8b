use serde::{Deserialize, Serialize};

/// A bounded, page-attributed segment of a document's extracted text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    /// The chunk text, including any overlap carried from the previous chunk
    pub content: String,

    /// Position in emission order (0-based)
    pub index: usize,

    /// First page contributing to this chunk (1-indexed)
    pub start_page: u32,

    /// Last page contributing to this chunk (1-indexed, inclusive)
    pub end_page: u32,

    /// Estimated token count of `content`
    pub token_count: usize,
}

impl DocumentChunk {
    /// Create a new document chunk
    #[must_use]
    pub const fn new(
        content: String,
        index: usize,
        start_page: u32,
        end_page: u32,
        token_count: usize,
    ) -> Self {
        Self {
            content,
            index,
            start_page,
            end_page,
            token_count,
        }
    }

    /// Number of pages this chunk spans
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.end_page.saturating_sub(self.start_page) + 1
    }

    /// Check if the chunk covers a specific page
    #[must_use]
    pub const fn covers_page(&self, page: u32) -> bool {
        page >= self.start_page && page <= self.end_page
    }
}
