//! Splits cleaned document text into bounded, overlap-preserving chunks
//! and turns a directory of documents into the chunk corpus.
//!
//! Packing works on paragraph boundaries (blank-line-separated blocks)
//! while the running buffer stays within `chunk_size` characters. When a
//! chunk is emitted, a suffix of its trailing paragraphs within the
//! `overlap` budget seeds the next buffer. A paragraph longer than
//! `chunk_size` has no usable boundary and is cut into fixed-width
//! character windows instead.

use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::clean::{clean_text, should_skip_path};
use crate::types::Chunk;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing content repeated at the start of the next
    /// chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1200, overlap: 300 }
    }
}

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Every returned chunk is trimmed and non-empty; overlap duplicates
/// content but never drops any. Terminates for every `overlap`,
/// including `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    // Length of buffer joined with blank lines, in characters.
    let mut buffer_len = 0usize;

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = para.chars().count();

        if para_len > chunk_size {
            // No paragraph boundary fits the budget; emit what we have
            // and window the paragraph by character offset.
            if !buffer.is_empty() {
                chunks.push(buffer.join("\n\n"));
                (buffer, buffer_len) = overlap_suffix(&buffer, overlap);
            }
            chunks.extend(split_oversized(para, chunk_size, overlap));
            continue;
        }

        let sep = if buffer.is_empty() { 0 } else { 2 };
        if !buffer.is_empty() && buffer_len + sep + para_len > chunk_size {
            chunks.push(buffer.join("\n\n"));
            (buffer, buffer_len) = overlap_suffix(&buffer, overlap);
            let sep = if buffer.is_empty() { 0 } else { 2 };
            if buffer_len + sep + para_len > chunk_size {
                // The overlap seed leaves no room; forfeit it rather
                // than emit an oversized chunk.
                buffer.clear();
                buffer_len = 0;
            }
        }

        let sep = if buffer.is_empty() { 0 } else { 2 };
        buffer_len += sep + para_len;
        buffer.push(para.to_string());
    }

    if !buffer.is_empty() {
        chunks.push(buffer.join("\n\n"));
    }
    chunks
}

/// Trailing paragraphs of `buffer` whose joined length stays within
/// `overlap`, in original order, with that joined length.
fn overlap_suffix(buffer: &[String], overlap: usize) -> (Vec<String>, usize) {
    let mut seed: Vec<String> = Vec::new();
    let mut seed_len = 0usize;
    for para in buffer.iter().rev() {
        let sep = if seed.is_empty() { 0 } else { 2 };
        let para_len = para.chars().count();
        if seed_len + sep + para_len > overlap {
            break;
        }
        seed_len += sep + para_len;
        seed.push(para.clone());
    }
    seed.reverse();
    (seed, seed_len)
}

/// Fixed-width character windows over a paragraph that exceeds
/// `chunk_size` on its own. The step is forced to at least one
/// character so `overlap >= chunk_size` cannot stall the loop.
fn split_oversized(paragraph: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        start += step;
    }
    out
}

/// Turns a document directory into the chunk corpus.
pub struct DocumentProcessor {
    chunking: ChunkingConfig,
}

impl DocumentProcessor {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Walk `docs_dir` recursively for `.md` and `.txt` files and
    /// produce chunks with dense ids assigned in sorted-path-then-chunk
    /// order, so a rebuild over the same tree yields the same ids.
    pub fn process_directory(&self, docs_dir: &Path) -> Result<Vec<Chunk>> {
        if !docs_dir.is_dir() {
            anyhow::bail!("docs directory not found: {}", docs_dir.display());
        }
        let files = list_doc_files(docs_dir);
        let mut chunks: Vec<Chunk> = Vec::new();
        for file_path in &files {
            let raw = read_file_lossy(file_path)?;
            let content = clean_text(&raw);
            if content.is_empty() {
                continue;
            }
            let rel = file_path.strip_prefix(docs_dir).unwrap_or(file_path);
            let source_path = rel.to_string_lossy().to_string();
            let texts = chunk_text(&content, self.chunking.chunk_size, self.chunking.overlap);
            for (sequence_index, text) in texts.into_iter().enumerate() {
                chunks.push(Chunk {
                    id: chunks.len(),
                    text,
                    source_path: source_path.clone(),
                    sequence_index,
                });
            }
        }
        debug!(files = files.len(), chunks = chunks.len(), "processed document directory");
        Ok(chunks)
    }
}

fn list_doc_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            matches!(p.extension().and_then(|s| s.to_str()), Some("md" | "txt"))
                && !should_skip_path(p)
        })
        .collect();
    files.sort();
    files
}

fn read_file_lossy(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("  \n\n \n ", 100, 10).is_empty());
    }

    #[test]
    fn short_text_is_one_trimmed_chunk() {
        let chunks = chunk_text("  hello world  ", 100, 10);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn paragraphs_pack_until_budget() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        // 4 + 2 + 4 + 2 + 4 = 16 fits in one chunk
        let chunks = chunk_text(text, 16, 0);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb\n\ncccc".to_string()]);
    }

    #[test]
    fn overlap_seeds_next_chunk_with_trailing_paragraph() {
        let p1 = "a".repeat(50);
        let p2 = "b".repeat(50);
        let p3 = "c".repeat(50);
        let text = format!("{p1}\n\n{p2}\n\n{p3}");
        let chunks = chunk_text(&text, 110, 60);
        assert_eq!(chunks.len(), 2, "expected two chunks: {chunks:?}");
        assert_eq!(chunks[0], format!("{p1}\n\n{p2}"));
        // p2 is repeated as overlap before p3
        assert_eq!(chunks[1], format!("{p2}\n\n{p3}"));
    }

    #[test]
    fn seed_is_dropped_when_it_leaves_no_room() {
        let p1 = "a".repeat(90);
        let p2 = "b".repeat(90);
        let text = format!("{p1}\n\n{p2}");
        // overlap budget admits p1 as seed, but p1 + p2 overflows; the
        // seed is forfeited instead of emitting an oversized chunk
        let chunks = chunk_text(&text, 100, 95);
        assert_eq!(chunks, vec![p1, p2]);
    }

    #[test]
    fn oversized_paragraph_is_windowed_by_chars() {
        let para = "x".repeat(300);
        let chunks = chunk_text(&para, 100, 20);
        // windows advance by 80: starts at 0, 80, 160, 240
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks[3].len(), 60);
    }

    #[test]
    fn every_chunk_respects_chunk_size() {
        let text = "word ".repeat(500);
        for &(size, overlap) in &[(1200usize, 300usize), (100, 30), (50, 0)] {
            for chunk in chunk_text(&text, size, overlap) {
                assert!(chunk.chars().count() <= size);
                assert!(!chunk.trim().is_empty());
            }
        }
    }

    #[test]
    fn overlap_at_or_above_chunk_size_terminates() {
        let para = "y".repeat(30);
        let chunks = chunk_text(&para, 10, 10);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));

        let chunks = chunk_text(&para, 10, 25);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn paragraph_order_is_preserved() {
        let paras: Vec<String> = (0..8).map(|i| format!("paragraph number {i} {}", "z".repeat(40))).collect();
        let text = paras.join("\n\n");
        let chunks = chunk_text(&text, 120, 0);
        let joined = chunks.join("\n\n");
        let mut last = 0;
        for p in &paras {
            let pos = joined[last..].find(p.as_str());
            assert!(pos.is_some(), "paragraph lost or reordered: {p}");
            last += pos.unwrap_or(0);
        }
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let para = "я".repeat(120);
        let chunks = chunk_text(&para, 50, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert_eq!(chunks[0].chars().count(), 50);
    }
}
