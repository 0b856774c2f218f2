use crate::config::KnowledgeConfig;
use crate::knowledge::types::{Chunk, PageRecord};

/// Break points tried from the end of a window backwards, best first
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits page records into overlapping windows of at most `chunk_size` characters.
/// Windows never cross a page boundary.
pub struct PageSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl PageSplitter {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self::with_sizes(config.chunk_size, config.chunk_overlap)
    }

    pub fn with_sizes(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split every page independently, keeping page order
    pub fn split_pages(&self, pages: &[PageRecord]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .map(move |text| Chunk {
                        text,
                        metadata: page.metadata.clone(),
                    })
            })
            .collect()
    }

    /// Split text into chunks with overlap
    pub fn split_text(&self, text: &str) -> Vec<String> {
        // Byte offset of every char, plus the end of the string
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let target = (start + self.chunk_size).min(total);
            let end = if target < total {
                self.find_break(text, &bounds, start, target)
            } else {
                target
            };

            let piece = text[bounds[start]..bounds[end]].trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            if end >= total {
                break;
            }

            // Move start with overlap; always advance
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }

    /// Find the char position to cut at, at or before `target`.
    /// The cut never lands so early that the next window would not advance.
    fn find_break(&self, text: &str, bounds: &[usize], start: usize, target: usize) -> usize {
        let floor = start + self.chunk_overlap + 1;
        if floor >= target {
            return target;
        }

        let window = &text[bounds[floor]..bounds[target]];
        for separator in SEPARATORS {
            if let Some(pos) = window.rfind(separator) {
                let cut_byte = bounds[floor] + pos + separator.len();
                // Convert back to a char position
                if let Ok(cut) = bounds.binary_search(&cut_byte) {
                    return cut;
                }
            }
        }

        target
    }
}
