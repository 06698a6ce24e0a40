//! Character-based text splitter.
//!
//! Splits on a separator, then greedily merges pieces back into chunks no
//! longer than `chunk_size` characters, carrying up to `chunk_overlap`
//! characters of trailing pieces into the next chunk.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::ChainError;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;
/// Default separator (paragraph break).
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Splits text into chunks on a fixed separator.
#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for CharacterTextSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl CharacterTextSplitter {
    /// Creates a splitter.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidConfig`] if `chunk_size` is zero or
    /// `chunk_overlap` exceeds `chunk_size`.
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ChainError> {
        if chunk_size == 0 {
            return Err(ChainError::InvalidConfig {
                message: "chunk size must be positive".to_string(),
            });
        }
        if chunk_overlap > chunk_size {
            return Err(ChainError::InvalidConfig {
                message: format!(
                    "chunk overlap ({chunk_overlap}) is larger than chunk size ({chunk_size})"
                ),
            });
        }
        Ok(Self {
            separator: separator.into(),
            chunk_size,
            chunk_overlap,
        })
    }

    /// Splits `text` into chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str())
                .filter(|s| !s.is_empty())
                .collect()
        };
        self.merge(&pieces)
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let sep_len = self.separator.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&current, total) > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "created a chunk longer than the chunk size"
                    );
                }
                if !current.is_empty() {
                    self.push_chunk(&mut chunks, &current);
                    while total > self.chunk_overlap
                        || (joined_len(&current, total) > self.chunk_size && total > 0)
                    {
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        total -= first.chars().count() + if current.is_empty() { 0 } else { sep_len };
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if total > self.chunk_size {
            warn!(
                size = total,
                chunk_size = self.chunk_size,
                "created a chunk longer than the chunk size"
            );
        }
        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, current: &VecDeque<&str>) {
        let chunk = current
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(self.separator.as_str());
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
    }
}
