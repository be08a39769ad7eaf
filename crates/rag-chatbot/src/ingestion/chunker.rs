//! Recursive text chunking with overlap
//!
//! Text is split on the coarsest boundary that appears in it (paragraphs, then lines, then
//! sentences, then words, then characters), recursing into any piece still larger than the
//! chunk size. Adjacent pieces are then merged greedily up to the chunk size, carrying up to
//! `chunk_overlap` characters of trailing context into the next chunk. Separators stay
//! attached to the piece that follows them, so every chunk is a contiguous slice of its page
//! (trimmed of surrounding whitespace). Lengths are measured in characters.

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, PageRecord};

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Literal(&'static str),
    Sentence,
    Char,
}

const BOUNDARIES: [Boundary; 5] = [
    Boundary::Literal("\n\n"),
    Boundary::Literal("\n"),
    Boundary::Sentence,
    Boundary::Literal(" "),
    Boundary::Char,
];

impl Boundary {
    /// Pieces whose concatenation is exactly `text`
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Boundary::Literal(sep) => {
                let mut pieces = Vec::new();
                let mut start = 0;
                for (idx, _) in text.match_indices(sep) {
                    if idx > start {
                        pieces.push(&text[start..idx]);
                    }
                    start = idx;
                }
                if start < text.len() {
                    pieces.push(&text[start..]);
                }
                pieces
            }
            Boundary::Sentence => text.split_sentence_bounds().collect(),
            Boundary::Char => text
                .char_indices()
                .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
                .collect(),
        }
    }

    fn applies(&self, text: &str) -> bool {
        match self {
            Boundary::Literal(sep) => text.contains(sep),
            Boundary::Sentence => text.split_sentence_bounds().nth(1).is_some(),
            Boundary::Char => true,
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits page text into overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting an overlap that leaves no room for new text
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        })
    }

    /// Chunk every page, keeping each page's source metadata on its chunks
    pub fn split(&self, pages: &[PageRecord]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            let metadata = page.chunk_metadata();
            chunks.extend(self.split_text(&page.text).into_iter().map(|text| Chunk {
                text,
                metadata: metadata.clone(),
            }));
        }

        tracing::debug!("Split {} pages into {} chunks", pages.len(), chunks.len());
        chunks
    }

    /// Split a single text into non-empty chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &BOUNDARIES)
    }

    fn split_recursive(&self, text: &str, boundaries: &[Boundary]) -> Vec<String> {
        let position = boundaries
            .iter()
            .position(|b| b.applies(text))
            .unwrap_or(boundaries.len().saturating_sub(1));
        let boundary = boundaries.get(position).copied().unwrap_or(Boundary::Char);
        let finer = boundaries.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in boundary.split(text) {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                // Only reachable if a single character exceeds the chunk size.
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily join adjacent pieces, each at most `chunk_size`, with trailing overlap
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    fn page(text: &str, page_number: u32) -> PageRecord {
        PageRecord::new(text, "manual.pdf", page_number, "/docs/manual.pdf").unwrap()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunker(1000, 200).split_text("A short paragraph.");
        assert_eq!(chunks, vec!["A short paragraph.".to_string()]);
    }

    #[test]
    fn test_paragraphs_preferred() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = chunker(100, 20).split_text(&text);
        assert_eq!(chunks, vec!["a".repeat(60), "b".repeat(60)]);
    }

    #[test]
    fn test_overlap_carries_context() {
        let text = (0..40).map(|i| format!("w{:02}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunker(50, 20).split_text(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word), "{:?} does not overlap {:?}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(250);
        let chunks = chunker(100, 10).split_text(&text);
        assert!(chunks.iter().all(|c| char_len(c) <= 100));
        assert_eq!(chunks[0].len(), 100);
    }

    #[test]
    fn test_chunks_are_bounded_contiguous_and_cover_page() {
        // Every token is unique, so each chunk has exactly one place in the text.
        let text: String = (0..400)
            .map(|i| match i % 37 {
                36 => format!("né{:03}.\n\n", i),
                n if n % 11 == 10 => format!("né{:03}.\n", i),
                n if n % 5 == 4 => format!("né{:03}. ", i),
                _ => format!("né{:03} ", i),
            })
            .collect();
        let chunker = chunker(120, 30);
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 10);

        let mut covered = vec![false; text.len()];
        let mut from = 0usize;
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(char_len(chunk) <= 120, "chunk too long: {}", char_len(chunk));

            let start = from
                + text[from..]
                    .find(chunk.as_str())
                    .unwrap_or_else(|| panic!("chunk out of order or not a slice: {:?}", chunk));
            covered[start..start + chunk.len()].iter_mut().for_each(|c| *c = true);
            from = start;
        }

        let missing: Vec<usize> = text
            .char_indices()
            .filter(|(idx, c)| !c.is_whitespace() && !covered[*idx])
            .map(|(idx, _)| idx)
            .collect();
        assert!(missing.is_empty(), "uncovered bytes at {:?}", missing);
    }

    #[test]
    fn test_three_long_pages_each_split_with_metadata() {
        let body = "policy ".repeat(215); // 1505 chars
        let pages: Vec<_> = (1..=3).map(|n| page(&body, n)).collect();

        let chunks = chunker(1000, 200).split(&pages);
        for n in 1..=3 {
            let on_page: Vec<_> = chunks.iter().filter(|c| c.metadata.page_number == n).collect();
            assert!(on_page.len() >= 2, "page {} produced {} chunks", n, on_page.len());
            assert!(on_page.iter().all(|c| c.metadata.filename == "manual.pdf"));
            assert!(on_page.iter().all(|c| c.metadata.source_path == "/docs/manual.pdf"));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "One. Two three.\nFour five six seven.\n\nEight nine ten. ".repeat(30);
        let chunker = chunker(80, 15);
        assert_eq!(chunker.split_text(&text), chunker.split_text(&text));
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let err = TextChunker::new(&ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        })
        .unwrap_err();
        assert!(err.is_config());
    }
}
