//! Fixed-window text chunking with overlap.
//!
//! Splitting happens on raw character offsets, not semantic units. That keeps
//! rebuilds reproducible and the coverage guarantee trivial to state; smarter
//! boundary selection is an explicit non-goal.

/// Splits `text` into overlapping windows of at most `chunk_size` characters.
///
/// Consecutive windows advance by `chunk_size - chunk_overlap` characters, so
/// every character of the input appears in at least one chunk. Only the final
/// chunk may be shorter than `chunk_size`. Empty or whitespace-only input
/// yields no chunks — the caller treats that as "nothing to index", not an
/// error.
///
/// Deterministic: the same input and parameters always produce the same
/// chunk sequence.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    debug_assert!(chunk_size > 0, "chunk_size must be positive");
    debug_assert!(
        chunk_overlap < chunk_size,
        "chunk_overlap must stay below chunk_size"
    );
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Vec::new();
    }

    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let stride = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }

    chunks
}
