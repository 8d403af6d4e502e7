//! Text utilities for the analysis pipeline: sentence-boundary chunking,
//! date extraction from call filenames, and content hashing for change
//! detection on re-import.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Split long text into chunks no longer than `max_chars` characters,
/// breaking at sentence boundaries (`.`, `!`, `?` followed by whitespace).
///
/// A single sentence longer than `max_chars` becomes its own oversized
/// chunk rather than being split mid-sentence. Only the first chunk is sent
/// to the analysis service; the caller attaches a truncation note when more
/// than one chunk comes back.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len + 1 <= max_chars {
            current.push(sentence);
            current_len += sentence_len + 1; // +1 for the joining space
        } else {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = vec![sentence];
            current_len = sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Split text on sentence-ending punctuation followed by whitespace.
/// The punctuation stays with its sentence; the whitespace run is consumed.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut boundary: Option<usize> = None; // byte offset just past ".!?"

    for (idx, ch) in text.char_indices() {
        match ch {
            '.' | '!' | '?' => boundary = Some(idx + ch.len_utf8()),
            c if c.is_whitespace() => {
                if let Some(end) = boundary {
                    if end > start {
                        sentences.push(&text[start..end]);
                    }
                    start = idx + c.len_utf8();
                    boundary = None;
                } else if start == idx {
                    // leading whitespace after a boundary — keep skipping
                    start = idx + c.len_utf8();
                }
            }
            _ => boundary = None,
        }
    }

    if start < text.len() {
        let tail = text[start..].trim_end();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences
}

/// Extract a call date from common filename patterns, returning
/// `YYYY-MM-DD`-style strings where possible and an empty string when no
/// pattern matches.
pub fn extract_date_from_filename(file_name: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            // YYYY-MM-DD, YYYY/MM/DD, YYYY_MM_DD
            Regex::new(r"(\d{4}[-_/]\d{1,2}[-_/]\d{1,2})").unwrap(),
            // MM-DD-YYYY, MM/DD/YYYY, MM_DD_YYYY
            Regex::new(r"(\d{1,2}[-_/]\d{1,2}[-_/]\d{4})").unwrap(),
            // YYYYMMDD
            Regex::new(r"(\d{8})").unwrap(),
        ]
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(file_name) {
            let date_str = &caps[1];
            // Normalize YYYYMMDD to YYYY-MM-DD
            if date_str.len() == 8 && date_str.chars().all(|c| c.is_ascii_digit()) {
                return format!("{}-{}-{}", &date_str[..4], &date_str[4..6], &date_str[6..]);
            }
            return date_str.to_string();
        }
    }

    String::new()
}

/// SHA-256 hex digest of a transcript, used to skip unchanged rows on
/// CSV re-import.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("Hello there. How are you?", 8000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello there. How are you?");
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 8000).is_empty());
    }

    #[test]
    fn test_long_transcript_first_chunk_within_limit() {
        // ~20,000 characters of short sentences
        let sentence = "The caller asked about the withdrawal process. ";
        let text = sentence.repeat(420);
        assert!(text.len() > 19_000);

        let chunks = chunk_text(&text, 8000);
        assert!(chunks.len() > 1);
        assert!(chunks[0].chars().count() <= 8000);
        // No sentence is split in the middle
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_oversized_sentence_becomes_own_chunk() {
        let giant = "a".repeat(500);
        let text = format!("Short one. {}. Another short one.", giant);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].chars().count() > 100);
    }

    #[test]
    fn test_extract_date_iso() {
        assert_eq!(
            extract_date_from_filename("call_2024-03-15_agent7.wav"),
            "2024-03-15"
        );
        assert_eq!(
            extract_date_from_filename("call_2024_03_15.wav"),
            "2024_03_15"
        );
    }

    #[test]
    fn test_extract_date_compact() {
        assert_eq!(extract_date_from_filename("rec20240315.mp3"), "2024-03-15");
    }

    #[test]
    fn test_extract_date_absent() {
        assert_eq!(extract_date_from_filename("no_date_here.wav"), "");
    }

    #[test]
    fn test_content_hash_is_stable_and_distinct() {
        let a = content_hash("hello");
        let b = content_hash("hello");
        let c = content_hash("hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
