//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce ownership and hierarchy invariants before anything is written.
//! - Classify failures into the shared [`ErrorKind`] taxonomy.

pub mod note_service;
pub mod topic_service;

use crate::repo::RepoError;

/// Failure class shared by every service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input such as a blank name. Caller must fix the input.
    Validation,
    /// Entity is absent or owned by someone else. The two are indistinguishable.
    NotFound,
    /// Structurally disallowed mutation (self-parent, cyclic move).
    InvalidOperation,
    /// Persisted state violates a core invariant.
    Integrity,
    /// Storage transport or schema failure.
    Storage,
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TopicNotFound(_) | Self::NoteNotFound(_) => ErrorKind::NotFound,
            Self::InvalidData(_) => ErrorKind::Integrity,
            Self::Db(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorKind::Storage,
        }
    }
}

/// Trims a user-facing name; returns `None` when nothing is left.
fn normalize_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
