use crate::config::RetrievalConfig;

/// Splits source text into overlapping fixed-size word windows.
///
/// Word counts stand in for tokens: with the defaults (150 words, 30-word
/// overlap) each chunk carries a focused semantic signal while neighboring
/// chunks share enough context to survive boundary cuts.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Split `text` into chunks.
    ///
    /// A body of at most `chunk_size` words is returned whole, as a single
    /// chunk. Longer bodies produce windows of `chunk_size` words where each
    /// window starts `chunk_size - chunk_overlap` words after the previous
    /// one; the final window ends exactly at the last word. A blank body
    /// yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if start + self.chunk_size >= words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 150,
            chunk_overlap: 30,
        }
    }
}
