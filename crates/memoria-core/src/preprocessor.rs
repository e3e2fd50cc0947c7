//! Preprocessor
//!
//! Normalizes a raw query string, classifies its intent from a closed set,
//! extracts keywords, and embeds it — all the Orchestrator needs before
//! dispatching tier retrievals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::keywords::extract_keywords;

/// Closed set of coarse query intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Looking for code (functions, modules, symbols).
    CodeSearch,
    /// Diagnosing an error, bug, or traceback.
    Debug,
    /// Looking for documentation or explanation.
    Documentation,
    /// Looking for commit/change history.
    CommitLog,
    /// No rule matched.
    General,
}

/// A preprocessed query, ready for tier dispatch.
#[derive(Debug, Clone)]
pub struct QueryObject {
    /// Original, unmodified input.
    pub raw_text: String,
    /// Lowercased, punctuation-stripped, whitespace-collapsed text.
    pub normalized_text: String,
    /// Embedding of `normalized_text`, if one could be computed.
    pub embedding: Option<Vec<f32>>,
    /// Classified intent.
    pub intent: Intent,
    /// Extracted keyword set.
    pub keywords: Vec<String>,
    /// When preprocessing ran.
    pub timestamp: DateTime<Utc>,
}

impl QueryObject {
    /// Whether an embedding was actually computed for this query.
    pub fn embedding_present(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Keyword rules used to classify intent, checked in order; the first match
/// wins. Declared as data, not cascaded `if`s, so the vocabulary can grow
/// without restructuring the classifier.
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Debug,
        &["bug", "error", "traceback", "exception", "crash", "fail", "panic"],
    ),
    (
        Intent::CommitLog,
        &["commit", "changelog", "diff", "merge", "revert", "history"],
    ),
    (
        Intent::Documentation,
        &["docs", "documentation", "readme", "explain", "howto", "guide"],
    ),
    (
        Intent::CodeSearch,
        &["function", "class", "module", "symbol", "implementation", "struct", "fn"],
    ),
];

fn classify_intent(normalized_text: &str) -> Intent {
    for (intent, triggers) in INTENT_RULES {
        if triggers.iter().any(|t| normalized_text.contains(t)) {
            return *intent;
        }
    }
    Intent::General
}

fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Normalizes, classifies, and embeds raw query text.
pub struct Preprocessor {
    embedder: Arc<dyn Embedder>,
}

impl Preprocessor {
    /// Build a preprocessor backed by `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Preprocess `raw_text` into a `QueryObject`.
    pub fn preprocess(&self, raw_text: &str) -> QueryObject {
        let normalized_text = normalize(raw_text);
        let intent = classify_intent(&normalized_text);
        let keywords = extract_keywords(&normalized_text);
        let embedding = if normalized_text.is_empty() {
            None
        } else {
            self.embedder.embed(&normalized_text).ok()
        };

        QueryObject {
            raw_text: raw_text.to_string(),
            normalized_text,
            embedding,
            intent,
            keywords,
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(Arc::new(HashEmbedder::new(8)))
    }

    #[test]
    fn normalizes_case_and_punctuation() {
        let q = preprocessor().preprocess("What's the Bug in main.rs?!");
        assert_eq!(q.normalized_text, "what s the bug in main rs");
    }

    #[test]
    fn classifies_debug_intent() {
        let q = preprocessor().preprocess("I got a traceback when running tests");
        assert_eq!(q.intent, Intent::Debug);
    }

    #[test]
    fn classifies_commit_log_intent() {
        let q = preprocessor().preprocess("show me the commit history for this file");
        assert_eq!(q.intent, Intent::CommitLog);
    }

    #[test]
    fn defaults_to_general_when_no_rule_matches() {
        let q = preprocessor().preprocess("hello there friend");
        assert_eq!(q.intent, Intent::General);
    }

    #[test]
    fn keywords_drop_short_and_stop_words() {
        let q = preprocessor().preprocess("the function is not working");
        assert!(q.keywords.contains(&"function".to_string()));
        assert!(q.keywords.contains(&"working".to_string()));
        assert!(!q.keywords.contains(&"the".to_string()));
    }

    #[test]
    fn empty_query_has_no_embedding() {
        let q = preprocessor().preprocess("   ");
        assert!(!q.embedding_present());
    }
}
