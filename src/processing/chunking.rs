//! Positional chunking.
//!
//! Text is cut into fixed windows of `chunk_size` characters; consecutive windows share
//! `overlap` characters so spans around a boundary stay visible to retrieval. Boundaries ignore
//! sentences and words entirely.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so a window never splits a
//! multi-byte character.

use super::types::{ChunkingError, Fragment};

/// Default window length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;

/// Window parameters for [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    /// Maximum fragment length.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next fragment.
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingOptions {
    /// Distance between the starts of consecutive fragments.
    ///
    /// Fails when `overlap >= chunk_size`, which would otherwise never advance.
    pub fn step(&self) -> Result<usize, ChunkingError> {
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfiguration {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(self.chunk_size - self.overlap)
    }
}

/// Split `text` into overlapping windows.
///
/// The first window starts at offset 0; each following window starts `chunk_size - overlap`
/// characters later. Splitting stops once a window reaches the end of the input, so the last
/// fragment may be shorter than `chunk_size` and no fragment is fully contained in its
/// predecessor. Input no longer than `chunk_size` yields exactly one fragment; empty input
/// yields none.
pub fn chunk_text(text: &str, options: &ChunkingOptions) -> Result<Vec<String>, ChunkingError> {
    let step = options.step()?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every character boundary, including the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + options.chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    tracing::trace!(
        chars = char_count,
        chunk_size = options.chunk_size,
        overlap = options.overlap,
        chunks = chunks.len(),
        "Chunked text"
    );
    Ok(chunks)
}

/// Chunk `text` and assign each window a fresh identifier.
pub fn split_into_fragments(
    text: &str,
    options: &ChunkingOptions,
) -> Result<Vec<Fragment>, ChunkingError> {
    Ok(chunk_text(text, options)?
        .into_iter()
        .map(Fragment::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn options(chunk_size: usize, overlap: usize) -> ChunkingOptions {
        ChunkingOptions {
            chunk_size,
            overlap,
        }
    }

    fn expected_count(n: usize, l: usize, o: usize) -> usize {
        if n > l - o { (n - o).div_ceil(l - o) } else { 1 }
    }

    #[test]
    fn nine_hundred_chars_make_two_fragments() {
        let text = "A".repeat(900);
        let chunks = chunk_text(&text, &ChunkingOptions::default()).expect("chunks");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 800);
        assert_eq!(chunks[1].chars().count(), 180);
    }

    #[test]
    fn short_input_is_a_single_fragment() {
        let chunks = chunk_text("hello", &ChunkingOptions::default()).expect("chunks");
        assert_eq!(chunks, vec!["hello".to_string()]);

        let just_under = "x".repeat(790);
        let chunks = chunk_text(&just_under, &ChunkingOptions::default()).expect("chunks");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let chunks = chunk_text("", &ChunkingOptions::default()).expect("chunks");
        assert!(chunks.is_empty());
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        for (size, overlap) in [(10, 10), (10, 11), (0, 0)] {
            let error = chunk_text("abc", &options(size, overlap)).unwrap_err();
            assert!(matches!(
                error,
                ChunkingError::InvalidConfiguration { chunk_size, overlap: o }
                    if chunk_size == size && o == overlap
            ));
        }
    }

    #[test]
    fn fragments_cover_input_without_gaps() {
        let text: String = (0..997).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (size, overlap) in [(10, 0), (10, 3), (50, 49), (100, 20), (997, 5), (2000, 10)] {
            let opts = options(size, overlap);
            let chunks = chunk_text(&text, &opts).expect("chunks");
            assert_eq!(chunks.len(), expected_count(997, size, overlap), "{opts:?}");

            let step = size - overlap;
            let mut rebuilt = String::new();
            for (index, chunk) in chunks.iter().enumerate() {
                let start = index * step;
                assert!(text[start..].starts_with(chunk.as_str()), "{opts:?} #{index}");
                assert!(chunk.chars().count() <= size);
                let covered = rebuilt.chars().count();
                assert!(start <= covered, "gap before fragment {index}");
                rebuilt.extend(chunk.chars().skip(covered - start));
            }
            assert_eq!(rebuilt, text, "{opts:?}");
        }
    }

    #[test]
    fn multibyte_characters_are_never_split() {
        let text = "é".repeat(25);
        let chunks = chunk_text(&text, &options(10, 2)).expect("chunks");
        assert_eq!(chunks.len(), expected_count(25, 10, 2));
        assert!(chunks.iter().all(|chunk| chunk.chars().all(|c| c == 'é')));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn fragments_receive_unique_ids() {
        let text = "B".repeat(3000);
        let fragments = split_into_fragments(&text, &ChunkingOptions::default()).expect("frags");
        let ids: HashSet<_> = fragments.iter().map(|fragment| fragment.id.clone()).collect();
        assert_eq!(ids.len(), fragments.len());
    }
}
