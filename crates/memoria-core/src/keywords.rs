//! Shared keyword extraction
//!
//! Used by both the Preprocessor (query keywords) and the Summarizer
//! (topic/entity extraction): content words of length ≥ 3, stop-listed,
//! uniquified, order-preserving.

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "but", "not", "you", "your", "that", "this",
    "with", "have", "has", "had", "from", "they", "them", "their", "what", "when", "where",
    "which", "who", "whom", "how", "why", "can", "will", "would", "should", "could", "about",
    "into", "over", "after", "before", "then", "than", "there", "here", "its", "his", "her",
    "our", "out", "off", "all", "any", "each", "few", "more", "most", "some", "such", "only",
    "own", "same", "too", "very", "just", "also", "use", "used", "using",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Extract content words (length ≥ 3, not stop-listed) from `text`, lowercased,
/// uniquified, order-preserving.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 3 {
            continue;
        }
        let word = raw.to_lowercase();
        if is_stop_word(&word) {
            continue;
        }
        if seen.insert(word.clone()) {
            out.push(word);
        }
    }
    out
}

/// Union of keyword sets from multiple texts, uniquified, order-preserving.
pub fn union_keywords<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for text in texts {
        for kw in extract_keywords(text) {
            if seen.insert(kw.clone()) {
                out.push(kw);
            }
        }
    }
    out
}
