//! Word-count based transcript chunking.

use std::num::NonZeroUsize;

/// Words per chunk when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(500) {
    Some(size) => size,
    None => panic!("default chunk size must be non-zero"),
};

/// Split `text` on whitespace and regroup the words into chunks of at most
/// `chunk_size` words, each joined with single spaces.
///
/// Empty or whitespace-only text yields no chunks. Every chunk except possibly
/// the last holds exactly `chunk_size` words; none is empty.
pub fn chunk_text(text: &str, chunk_size: NonZeroUsize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_size.get())
        .map(|group| group.join(" "))
        .collect()
}
