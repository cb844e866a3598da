//! Fixed-size text chunking for analyzer transmission.
//!
//! Splitting is on character boundaries, not sentences — predictable
//! chunk counts matter more here than prose-aware breaks, and the
//! merger tolerates entities straddling a boundary.

use crate::TextChunk;

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Properties:
/// - empty input produces no chunks;
/// - non-empty input produces `ceil(chars / chunk_size)` chunks;
/// - input that fits within the limit is returned as a single chunk;
/// - concatenating `content` in index order reconstructs the input exactly.
pub fn split_into_chunks(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    let chunk_size = chunk_size.max(1);
    if text.is_empty() {
        return Vec::new();
    }

    let mut contents: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            contents.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        contents.push(current);
    }

    let total_chunks = contents.len();
    contents
        .into_iter()
        .enumerate()
        .map(|(index, content)| TextChunk {
            index,
            total_chunks,
            content,
        })
        .collect()
}
