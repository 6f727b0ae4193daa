//! # Text Chunking Module
//!
//! Splits page and document text into overlapping, fixed-size word windows.
//!
//! ## Key Components
//!
//! - `TextChunk`: One window with its ordinal and the total window count
//! - `chunk_words`: Primary function for splitting text into chunks
//! - `content_hash`: Digest of a page's source text, used for change detection
//!
//! ## Chunking Strategy
//!
//! Text is split on whitespace. Window `i` starts at word `i * (size - overlap)` and
//! holds up to `size` words; windows are produced while the start lies inside the
//! text, so the tail of a long text may appear in more than one window. Identical
//! input always yields the identical chunk list.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::processor::ChunkOptions;
use crate::processor::error::ProcessError;

/// A chunk of text with its place in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The words of the window joined by single spaces
    pub text: String,

    /// Zero-based position of the chunk in its source
    pub ordinal: usize,

    /// Number of chunks the source produced
    pub total: usize,
}

/// Chunk text into overlapping word windows
///
/// # Arguments
///
/// * `text` - The text to chunk
/// * `options` - Window size and overlap, in words
///
/// # Returns
///
/// The chunks in source order, or an error if `overlap >= chunk_size`
#[instrument(skip(text), fields(len = text.len()))]
pub fn chunk_words(text: &str, options: &ChunkOptions) -> Result<Vec<TextChunk>, ProcessError> {
    if options.chunk_size == 0 {
        return Err(ProcessError::Chunking("chunk size must be positive".to_string()));
    }
    if options.overlap >= options.chunk_size {
        return Err(ProcessError::Chunking(format!(
            "overlap ({}) must be smaller than chunk size ({})",
            options.overlap, options.chunk_size
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = options.chunk_size - options.overlap;

    let windows: Vec<String> = (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + options.chunk_size).min(words.len());
            words[start..end].join(" ")
        })
        .collect();

    let total = windows.len();
    debug!("Split {} words into {} chunks", words.len(), total);

    Ok(windows
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| TextChunk {
            text,
            ordinal,
            total,
        })
        .collect())
}

/// Hex-encoded SHA-256 of `text`
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn options(chunk_size: usize, overlap: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_words("  hello \n\t world  ", &ChunkOptions::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].total, 1);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_words("", &ChunkOptions::default()).unwrap().is_empty());
        assert!(chunk_words(" \n ", &ChunkOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk_words(&words(10), &options(4, 1)).unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(
            texts,
            vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9", "w9"]
        );
        assert!(chunks.iter().all(|c| c.total == 4));
    }

    #[test]
    fn test_default_window_counts() {
        // starts at 0, 800, 1600, 2400
        let chunks = chunk_words(&words(2500), &ChunkOptions::default()).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text.split(' ').count(), 1000);
        assert_eq!(chunks[3].text.split(' ').count(), 100);

        for pair in chunks[..3].windows(2) {
            let prev: Vec<&str> = pair[0].text.split(' ').collect();
            let next: Vec<&str> = pair[1].text.split(' ').collect();
            assert_eq!(&next[..200], &prev[800..]);
        }

        let short = chunk_words(&words(799), &ChunkOptions::default()).unwrap();
        assert_eq!(short.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = words(3333);
        assert_eq!(
            chunk_words(&text, &ChunkOptions::default()).unwrap(),
            chunk_words(&text, &ChunkOptions::default()).unwrap()
        );
    }

    #[test]
    fn test_invalid_options() {
        assert!(chunk_words("a b c", &options(10, 10)).is_err());
        assert!(chunk_words("a b c", &options(0, 0)).is_err());
    }

    #[test]
    fn test_content_hash() {
        let hash = content_hash("hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(hash, content_hash("hello "));
    }
}
