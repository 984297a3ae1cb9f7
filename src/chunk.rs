//! Character-based chunking for chapters that exceed the single-call limit.

/// Chapters longer than this are split into multiple chunks.
pub const CHUNK_SIZE: usize = 20_000;

/// Splits `text` into consecutive `CHUNK_SIZE`-character segments.
///
/// Purely character-based: no attempt is made to align to paragraph or
/// sentence boundaries. Returns a single-element vector for inputs at or
/// below `CHUNK_SIZE`.
pub fn split_into_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= CHUNK_SIZE {
        return vec![text.to_string()];
    }

    chars
        .chunks(CHUNK_SIZE)
        .map(|slice| slice.iter().collect())
        .collect()
}

/// Joins condensed chunk outputs back into one chapter body.
pub fn join_chunks(chunks: &[String]) -> String {
    chunks.join("\n\n")
}
