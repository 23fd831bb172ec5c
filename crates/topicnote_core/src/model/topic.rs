//! Topic domain model.
//!
//! # Responsibility
//! - Define the persisted topic record and its tree-shaped read models.
//!
//! # Invariants
//! - `id` is stable and never reused for another topic.
//! - `parent_id`, when set, names a topic with the same `owner_id`.
//! - Topics never embed each other; hierarchy is expressed by id references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a topic.
pub type TopicId = Uuid;

/// Persisted topic row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    /// User-facing label, trimmed and non-empty.
    pub name: String,
    /// Identifier of the owning user, supplied by the authenticated caller.
    pub owner_id: String,
    /// `None` means root-level topic.
    pub parent_id: Option<TopicId>,
    /// Position among siblings. New and moved topics are appended.
    pub sort_order: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms timestamp of the last rename or move.
    pub updated_at: i64,
}

impl Topic {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Topic with its materialized subtree.
///
/// Serialized flat: topic fields plus a `subtopics` array. Traversal helpers
/// and `Drop` walk the tree with an explicit stack, so depth is bounded by
/// memory only. Derived `Serialize`, `Clone` and `PartialEq` still recurse;
/// check [`TopicTree::depth`] before handing very deep trees to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicTree {
    #[serde(flatten)]
    pub topic: Topic,
    pub subtopics: Vec<TopicTree>,
}

impl TopicTree {
    pub fn leaf(topic: Topic) -> Self {
        Self {
            topic,
            subtopics: Vec::new(),
        }
    }

    /// Counts every topic below this node, at any depth.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&TopicTree> = vec![self];
        while let Some(node) = pending.pop() {
            count += node.subtopics.len();
            pending.extend(node.subtopics.iter());
        }
        count
    }

    /// Number of levels below this node; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending: Vec<(&TopicTree, usize)> = vec![(self, 0)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.subtopics.iter().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Collects ids of this node and all descendants in depth-first order.
    pub fn ids(&self) -> Vec<TopicId> {
        self.preorder().map(|node| node.topic.id).collect()
    }

    /// Finds a node by id within this subtree.
    pub fn find(&self, id: TopicId) -> Option<&TopicTree> {
        self.preorder().find(|node| node.topic.id == id)
    }

    /// Depth-first pre-order walk, siblings in stored order.
    fn preorder(&self) -> impl Iterator<Item = &TopicTree> {
        let mut pending: Vec<&TopicTree> = vec![self];
        std::iter::from_fn(move || {
            let node = pending.pop()?;
            pending.extend(node.subtopics.iter().rev());
            Some(node)
        })
    }
}

impl Drop for TopicTree {
    fn drop(&mut self) {
        // Detach children before they drop so no drop nests another.
        let mut pending = std::mem::take(&mut self.subtopics);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.subtopics);
        }
    }
}

/// Minimal topic projection attached to notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: TopicId,
    pub name: String,
}

/// Acknowledgement returned by a cascading topic delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicDeletion {
    pub topic_id: TopicId,
    /// Deleted topic count, including `topic_id` itself.
    pub deleted_topics: u64,
    pub deleted_notes: u64,
}
