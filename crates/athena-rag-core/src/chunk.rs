//! Newline-separated text chunker with character overlap.
//!
//! Splits canonical schema text into [`Chunk`]s bounded by `max_chars`.
//! Splitting happens on line boundaries so a column listing or a
//! `CREATE TABLE` line is never cut in half, and consecutive chunks share
//! a tail of characters so context that straddles a boundary is still
//! retrievable from either side.
//!
//! # Algorithm
//!
//! 1. Split text on `\n` into paragraphs; drop blank ones.
//! 2. Accumulate paragraphs (joined with `\n`) into a buffer.
//! 3. When appending the next paragraph would exceed `max_chars`, close the
//!    buffer as a chunk and seed the next buffer with the last
//!    `overlap_chars` characters of the closed chunk.
//! 4. The seed shrinks when needed so that seed + paragraph still fits; a
//!    single paragraph longer than `max_chars` becomes its own oversized
//!    chunk with no seed.
//!
//! Lengths are counted in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use athena_rag_core::chunk::split;
//!
//! let chunks = split("CREATE TABLE a(id INT);\nCREATE TABLE b(id INT);", 1000, 200).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].index, 0);
//! ```

use crate::error::{RagError, Result};
use crate::models::Chunk;

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHARS: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

const SEPARATOR: char = '\n';

/// Split `text` into ordered, overlapping chunks of at most `max_chars`.
///
/// # Errors
///
/// - [`RagError::InvalidConfig`] if `max_chars` is 0 or `overlap_chars >= max_chars`.
/// - [`RagError::EmptyInput`] if `text` has no non-blank line.
///
/// # Guarantees
///
/// - At least one chunk for any input with content.
/// - Indices are contiguous: `0, 1, …, N-1`.
/// - `chunk.overlap_chars` leading characters of every chunk after the
///   first are a suffix of the previous chunk, followed by `\n`.
pub fn split(text: &str, max_chars: usize, overlap_chars: usize) -> Result<Vec<Chunk>> {
    validate(max_chars, overlap_chars)?;

    let paragraphs: Vec<&str> = text
        .split(SEPARATOR)
        .map(str::trim_end)
        .filter(|p| !p.trim().is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Err(RagError::EmptyInput);
    }

    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    let mut seed_chars = 0usize;
    let mut has_new_content = false;

    for para in paragraphs {
        let para_chars = para.chars().count();
        let would_be = if buf.is_empty() {
            para_chars
        } else {
            buf_chars + 1 + para_chars
        };

        if would_be > max_chars && has_new_content {
            let room = max_chars.saturating_sub(para_chars + 1);
            let seed = tail_chars(&buf, overlap_chars.min(room)).to_string();

            chunks.push(Chunk {
                index: chunks.len(),
                text: std::mem::take(&mut buf),
                overlap_chars: seed_chars,
            });

            seed_chars = seed.chars().count();
            buf_chars = seed_chars;
            buf = seed;
            has_new_content = false;
        }

        if !buf.is_empty() {
            buf.push(SEPARATOR);
            buf_chars += 1;
        }
        buf.push_str(para);
        buf_chars += para_chars;
        has_new_content = true;
    }

    if has_new_content {
        chunks.push(Chunk {
            index: chunks.len(),
            text: buf,
            overlap_chars: seed_chars,
        });
    }

    Ok(chunks)
}

/// Check chunk sizing parameters.
pub fn validate(max_chars: usize, overlap_chars: usize) -> Result<()> {
    if max_chars == 0 {
        return Err(RagError::InvalidConfig(
            "chunk size must be greater than 0".to_string(),
        ));
    }
    if overlap_chars >= max_chars {
        return Err(RagError::InvalidConfig(format!(
            "chunk overlap ({overlap_chars}) must be smaller than chunk size ({max_chars})"
        )));
    }
    Ok(())
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}
