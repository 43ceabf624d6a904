//! Word-level text chunking for batched synthesis.

use crate::error::{Error, Result};

/// Split `text` on whitespace and group consecutive words into chunks of
/// `chunk_size` words. The last chunk holds the remainder.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::InvalidInput(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    Ok(words
        .chunks(chunk_size)
        .map(|group| group.join(" "))
        .collect())
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
