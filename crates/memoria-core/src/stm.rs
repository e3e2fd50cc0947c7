//! Short-Term Memory (STM)
//!
//! A bounded, TTL-pruned FIFO of recent conversation turns. Writers and
//! readers share state behind a single `RwLock`, matching the reader-writer
//! guard the concurrency model calls for: writes (`add`, `clear`, the lazy
//! purge) are exclusive, reads are concurrent with each other.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embeddings::cosine_similarity;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message from the end user.
    User,
    /// A message from the assistant.
    Assistant,
    /// A system-level message (instructions, tool output, etc).
    System,
}

/// A single role-tagged message held in STM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn id.
    pub id: String,
    /// Who produced this turn.
    pub role: Role,
    /// Raw message text.
    pub content: String,
    /// Embedding of `content`, if one was computed.
    pub embedding: Option<Vec<f32>>,
    /// Coarse intent tag, if classified.
    pub intent: Option<String>,
    /// Extracted keyword set.
    pub keywords: Vec<String>,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
    /// Estimated token count of `content`.
    pub token_estimate: usize,
}

/// A turn scored against a query, as returned by `get_recent`/`search_by_embedding`.
#[derive(Debug, Clone)]
pub struct ScoredTurn {
    /// The matched turn.
    pub turn: Turn,
    /// Cosine similarity against the query embedding, or 0.0 if either side
    /// had no embedding.
    pub similarity: f32,
}

fn now() -> DateTime<Utc> {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch");
    DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()).unwrap_or_else(Utc::now)
}

fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

struct State {
    turns: VecDeque<Turn>,
}

/// Bounded FIFO of recent conversation turns with lazy TTL expiry.
pub struct ShortTermMemory {
    max: usize,
    ttl_seconds: i64,
    state: RwLock<State>,
}

impl ShortTermMemory {
    /// Create an STM tier holding at most `max` turns, expiring entries
    /// older than `ttl_seconds` (0 disables TTL).
    pub fn new(max: usize, ttl_seconds: i64) -> Self {
        Self {
            max: max.max(1),
            ttl_seconds,
            state: RwLock::new(State {
                turns: VecDeque::new(),
            }),
        }
    }

    /// Append a turn, evicting the oldest if over capacity.
    pub fn add(
        &self,
        role: Role,
        content: impl Into<String>,
        embedding: Option<Vec<f32>>,
        intent: Option<String>,
        keywords: Vec<String>,
    ) -> Turn {
        let content = content.into();
        let turn = Turn {
            id: Uuid::new_v4().to_string(),
            token_estimate: estimate_tokens(&content),
            role,
            content,
            embedding,
            intent,
            keywords,
            created_at: now(),
        };

        let mut state = self.state.write().expect("stm lock poisoned");
        self.purge_locked(&mut state);
        state.turns.push_back(turn.clone());
        while state.turns.len() > self.max {
            state.turns.pop_front();
        }
        turn
    }

    /// Last `n` turns, optionally ranked by similarity to `query_embedding`.
    pub fn get_recent(&self, n: usize, query_embedding: Option<&[f32]>) -> Vec<ScoredTurn> {
        let mut state = self.state.write().expect("stm lock poisoned");
        self.purge_locked(&mut state);

        match query_embedding {
            None => state
                .turns
                .iter()
                .rev()
                .take(n)
                .map(|t| ScoredTurn {
                    turn: t.clone(),
                    similarity: 0.0,
                })
                .rev()
                .collect(),
            Some(q) => self.ranked(&state.turns, q, n),
        }
    }

    /// Same ranking semantics as `get_recent` with an embedding, but ignores
    /// TTL expiry lazily (expired turns are skipped, not eagerly purged).
    pub fn search_by_embedding(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredTurn> {
        let state = self.state.read().expect("stm lock poisoned");
        let live: VecDeque<Turn> = state
            .turns
            .iter()
            .filter(|t| !self.is_expired(t))
            .cloned()
            .collect();
        self.ranked(&live, query_embedding, top_k)
    }

    fn ranked(&self, turns: &VecDeque<Turn>, query: &[f32], n: usize) -> Vec<ScoredTurn> {
        let mut scored: Vec<ScoredTurn> = turns
            .iter()
            .map(|t| {
                let similarity = t
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(query, e))
                    .unwrap_or(0.0);
                ScoredTurn {
                    turn: t.clone(),
                    similarity,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.turn.created_at.cmp(&a.turn.created_at))
        });
        scored.truncate(n);
        scored
    }

    /// Lazily purge turns past their TTL. Called at entry of every read
    /// operation that takes the write lock; `search_by_embedding` skips
    /// expired turns instead of purging, per the specification.
    pub fn expire(&self) {
        let mut state = self.state.write().expect("stm lock poisoned");
        self.purge_locked(&mut state);
    }

    fn purge_locked(&self, state: &mut State) {
        if self.ttl_seconds <= 0 {
            return;
        }
        let cutoff = now() - chrono::Duration::seconds(self.ttl_seconds);
        state.turns.retain(|t| t.created_at > cutoff);
    }

    fn is_expired(&self, turn: &Turn) -> bool {
        if self.ttl_seconds <= 0 {
            return false;
        }
        let cutoff = now() - chrono::Duration::seconds(self.ttl_seconds);
        turn.created_at <= cutoff
    }

    /// Remove all turns.
    pub fn clear(&self) {
        let mut state = self.state.write().expect("stm lock poisoned");
        state.turns.clear();
    }

    /// Current live turn count (after a lazy purge).
    pub fn len(&self) -> usize {
        let mut state = self.state.write().expect("stm lock poisoned");
        self.purge_locked(&mut state);
        state.turns.len()
    }

    /// Whether STM currently holds no turns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every live turn, in insertion order. Used by `snapshot`.
    pub fn all_turns(&self) -> Vec<Turn> {
        let mut state = self.state.write().expect("stm lock poisoned");
        self.purge_locked(&mut state);
        state.turns.iter().cloned().collect()
    }

    /// Replace the entire contents with `turns`, in the given order. Used
    /// when restoring from a snapshot.
    pub fn restore(&self, turns: Vec<Turn>) {
        let mut state = self.state.write().expect("stm lock poisoned");
        state.turns = turns.into_iter().collect();
    }
}
