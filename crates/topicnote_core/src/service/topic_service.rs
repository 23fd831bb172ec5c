//! Topic tree use-case service.
//!
//! # Responsibility
//! - Validate ownership and hierarchy invariants above the repository layer.
//! - Serve tree-shaped (subtree) and path-shaped (breadcrumb) queries.
//! - Provide topic create, rename, move, delete and search operations.
//!
//! # Invariants
//! - A parent must exist and belong to the acting user.
//! - Moves never make a topic its own ancestor.
//! - Every mutation runs inside one repository transaction; a failed check
//!   leaves the store untouched.
//! - Walks over parent links track visited ids and stop on a revisit.

use super::{normalize_name, ErrorKind};
use crate::model::forest::{HierarchyCycle, TopicForest};
use crate::model::topic::{Topic, TopicDeletion, TopicId, TopicTree};
use crate::repo::topic_repo::TopicRepository;
use crate::repo::RepoError;
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of topics returned by [`TopicService::search_topics`].
pub const TOPIC_SEARCH_LIMIT: u32 = 10;

/// Errors from topic service operations.
#[derive(Debug)]
pub enum TopicServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Target topic does not exist for the acting user.
    TopicNotFound(TopicId),
    /// Requested parent does not exist for the acting user.
    ParentNotFound(TopicId),
    /// Move target equals the moved topic.
    SelfParent(TopicId),
    /// Move target is a descendant of the moved topic.
    CyclicMove {
        topic_id: TopicId,
        parent_id: TopicId,
    },
    /// Stored parent links already loop through this topic.
    HierarchyCycle(TopicId),
    /// Stored parent link points at a topic that cannot be loaded.
    BrokenParentChain(TopicId),
    /// Repository-level failure.
    Repo(RepoError),
}

impl TopicServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName => ErrorKind::Validation,
            Self::TopicNotFound(_) | Self::ParentNotFound(_) => ErrorKind::NotFound,
            Self::SelfParent(_) | Self::CyclicMove { .. } => ErrorKind::InvalidOperation,
            Self::HierarchyCycle(_) | Self::BrokenParentChain(_) => ErrorKind::Integrity,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for TopicServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "topic name must not be blank"),
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent topic not found: {id}"),
            Self::SelfParent(id) => write!(f, "topic cannot be its own parent: {id}"),
            Self::CyclicMove {
                topic_id,
                parent_id,
            } => write!(
                f,
                "cyclic move: topic {topic_id} cannot move under its descendant {parent_id}"
            ),
            Self::HierarchyCycle(id) => {
                write!(f, "topic hierarchy contains a cycle through {id}")
            }
            Self::BrokenParentChain(id) => {
                write!(f, "topic hierarchy references missing ancestor {id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TopicServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TopicServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TopicNotFound(topic_id) => Self::TopicNotFound(topic_id),
            other => Self::Repo(other),
        }
    }
}

impl From<HierarchyCycle> for TopicServiceError {
    fn from(value: HierarchyCycle) -> Self {
        Self::HierarchyCycle(value.0)
    }
}

/// Topic tree manager facade.
pub struct TopicService<R: TopicRepository> {
    repo: R,
}

impl<R: TopicRepository> TopicService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one topic under an optional parent.
    pub fn create_topic(
        &self,
        owner_id: &str,
        name: &str,
        parent_id: Option<TopicId>,
    ) -> Result<Topic, TopicServiceError> {
        let name = normalize_name(name).ok_or(TopicServiceError::InvalidName)?;
        let topic = self.repo.atomically(|| {
            if let Some(parent_id) = parent_id {
                self.require_parent(owner_id, parent_id)?;
            }
            self.repo
                .insert_topic(owner_id, parent_id, name.as_str())
                .map_err(TopicServiceError::from)
        })?;
        info!(
            "event=topic_create module=topic_service status=ok topic_id={} root={}",
            topic.id,
            topic.is_root()
        );
        Ok(topic)
    }

    /// Lists root-level topics with their full subtrees.
    pub fn root_topics(&self, owner_id: &str) -> Result<Vec<TopicTree>, TopicServiceError> {
        self.root_topics_with_depth(owner_id, None)
    }

    /// Lists root-level topics expanding at most `max_depth` levels below each.
    pub fn root_topics_with_depth(
        &self,
        owner_id: &str,
        max_depth: Option<usize>,
    ) -> Result<Vec<TopicTree>, TopicServiceError> {
        let forest = TopicForest::new(self.repo.list_topics(owner_id)?);
        forest.root_trees(max_depth).map_err(|cycle| {
            error!(
                "event=topic_tree module=topic_service status=error error_code=hierarchy_cycle topic_id={}",
                cycle.0
            );
            cycle.into()
        })
    }

    /// Loads one topic with its full subtree.
    pub fn topic_by_id(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<TopicTree, TopicServiceError> {
        self.topic_by_id_with_depth(owner_id, topic_id, None)
    }

    /// Loads one topic expanding at most `max_depth` levels below it.
    pub fn topic_by_id_with_depth(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        max_depth: Option<usize>,
    ) -> Result<TopicTree, TopicServiceError> {
        let topic = self.require_topic(owner_id, topic_id)?;
        let forest = TopicForest::new(self.repo.list_topics(owner_id)?);
        forest.subtree(topic, max_depth).map_err(|cycle| {
            error!(
                "event=topic_tree module=topic_service status=error error_code=hierarchy_cycle topic_id={}",
                cycle.0
            );
            cycle.into()
        })
    }

    /// Lists direct children of one topic.
    pub fn subtopics(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<Vec<Topic>, TopicServiceError> {
        self.require_topic(owner_id, topic_id)?;
        self.repo
            .list_children(owner_id, Some(topic_id))
            .map_err(Into::into)
    }

    /// Rebuilds the path from the forest root down to `topic_id`, inclusive.
    ///
    /// A missing or foreign ancestor truncates the trail at that point; the
    /// returned trail then starts at the highest ancestor that could be
    /// loaded. A parent chain that revisits a topic fails with
    /// [`TopicServiceError::HierarchyCycle`].
    pub fn breadcrumb_trail(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<Vec<Topic>, TopicServiceError> {
        let start = self.require_topic(owner_id, topic_id)?;
        let mut visited = HashSet::from([start.id]);
        let mut cursor = start.parent_id;
        let mut trail = vec![start];

        while let Some(current) = cursor {
            if !visited.insert(current) {
                error!(
                    "event=breadcrumb_trail module=topic_service status=error error_code=hierarchy_cycle topic_id={topic_id} revisited={current}"
                );
                return Err(TopicServiceError::HierarchyCycle(current));
            }
            match self.repo.get_topic(owner_id, current)? {
                Some(ancestor) => {
                    cursor = ancestor.parent_id;
                    trail.push(ancestor);
                }
                None => {
                    warn!(
                        "event=breadcrumb_trail module=topic_service status=truncated topic_id={topic_id} missing_ancestor={current} depth={}",
                        trail.len()
                    );
                    break;
                }
            }
        }

        trail.reverse();
        Ok(trail)
    }

    /// Renames one topic.
    pub fn rename_topic(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        name: &str,
    ) -> Result<Topic, TopicServiceError> {
        let name = normalize_name(name).ok_or(TopicServiceError::InvalidName)?;
        self.repo.atomically(|| {
            self.repo.rename_topic(owner_id, topic_id, name.as_str())?;
            self.require_topic(owner_id, topic_id)
        })
    }

    /// Moves one topic under a new parent, or to root level when `None`.
    pub fn move_topic(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        new_parent_id: Option<TopicId>,
    ) -> Result<Topic, TopicServiceError> {
        let moved = self.repo.atomically(|| {
            self.require_topic(owner_id, topic_id)?;
            if let Some(parent_id) = new_parent_id {
                if parent_id == topic_id {
                    return Err(TopicServiceError::SelfParent(topic_id));
                }
                self.require_parent(owner_id, parent_id)?;
                self.ensure_not_descendant(owner_id, topic_id, parent_id)?;
            }
            self.repo.set_parent(owner_id, topic_id, new_parent_id)?;
            self.require_topic(owner_id, topic_id)
        });

        match &moved {
            Ok(topic) => info!(
                "event=topic_move module=topic_service status=ok topic_id={} root={}",
                topic.id,
                topic.is_root()
            ),
            Err(err) if err.kind() == ErrorKind::Integrity => error!(
                "event=topic_move module=topic_service status=error error_code=integrity topic_id={topic_id} error={err}"
            ),
            Err(_) => {}
        }
        moved
    }

    /// Deletes one topic with all descendant topics and their notes.
    pub fn delete_topic(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<TopicDeletion, TopicServiceError> {
        let deletion = self.repo.atomically(|| {
            self.require_topic(owner_id, topic_id)?;
            let counts = self.repo.subtree_counts(owner_id, topic_id)?;
            self.repo.delete_topic(owner_id, topic_id)?;
            Ok::<_, TopicServiceError>(TopicDeletion {
                topic_id,
                deleted_topics: counts.topics,
                deleted_notes: counts.notes,
            })
        })?;
        info!(
            "event=topic_delete module=topic_service status=ok topic_id={} deleted_topics={} deleted_notes={}",
            deletion.topic_id, deletion.deleted_topics, deletion.deleted_notes
        );
        Ok(deletion)
    }

    /// Lists up to [`TOPIC_SEARCH_LIMIT`] topics whose name contains `query`.
    ///
    /// Matching is case-sensitive and uses `query` verbatim, whitespace
    /// included. A missing or empty query lists the first topics in insertion
    /// order.
    pub fn search_topics(
        &self,
        owner_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<Topic>, TopicServiceError> {
        let needle = query.filter(|value| !value.is_empty());
        self.repo
            .search_topics(owner_id, needle, TOPIC_SEARCH_LIMIT)
            .map_err(Into::into)
    }

    fn require_topic(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<Topic, TopicServiceError> {
        self.repo
            .get_topic(owner_id, topic_id)?
            .ok_or(TopicServiceError::TopicNotFound(topic_id))
    }

    fn require_parent(
        &self,
        owner_id: &str,
        parent_id: TopicId,
    ) -> Result<Topic, TopicServiceError> {
        self.repo
            .get_topic(owner_id, parent_id)?
            .ok_or(TopicServiceError::ParentNotFound(parent_id))
    }

    /// Walks from `candidate_parent_id` up to the root and rejects the move
    /// when `topic_id` is met on the way.
    fn ensure_not_descendant(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        candidate_parent_id: TopicId,
    ) -> Result<(), TopicServiceError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == topic_id {
                return Err(TopicServiceError::CyclicMove {
                    topic_id,
                    parent_id: candidate_parent_id,
                });
            }
            if !visited.insert(current) {
                return Err(TopicServiceError::HierarchyCycle(current));
            }

            let ancestor = self
                .repo
                .get_topic(owner_id, current)?
                .ok_or(TopicServiceError::BrokenParentChain(current))?;
            cursor = ancestor.parent_id;
        }
        Ok(())
    }
}
