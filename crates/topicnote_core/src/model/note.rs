//! Note domain model.
//!
//! # Invariants
//! - Every note belongs to exactly one topic; its owner is the topic's owner.
//! - `body` is an opaque document value. Core stores and returns it without
//!   interpreting its structure.
//! - Object keys keep their original order. Numbers pass through
//!   `serde_json::Number`, so they come back as the nearest `i64`, `u64` or
//!   `f64` (`1.0` stays a float, `1e2` reads back as `100.0`).

use crate::model::topic::{TopicId, TopicSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// Rich-text document tree as produced by the editor.
pub type NoteBody = serde_json::Value;

/// Persisted note row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub name: String,
    pub body: NoteBody,
    pub topic_id: TopicId,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms timestamp of the last edit.
    pub updated_at: i64,
}

/// Note detail with the summary of its owning topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteWithTopic {
    #[serde(flatten)]
    pub note: Note,
    pub topic: TopicSummary,
}
