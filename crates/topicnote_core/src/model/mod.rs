//! Domain model for the topic forest and the notes attached to it.
//!
//! # Responsibility
//! - Define canonical records used by repositories and services.
//! - Keep hierarchy as id references resolved through a flat index.
//!
//! # Invariants
//! - Every topic and note is owned by exactly one user, directly (topic) or
//!   through its topic (note).
//! - Parent/child links never form a cycle within one owner's forest.

pub mod forest;
pub mod note;
pub mod topic;
