//! Request boundary over topic and note services.
//!
//! # Responsibility
//! - Expose every use case behind one connection-scoped facade.
//! - Collapse the service error taxonomy into three response classes.
//! - Dispatch serialized requests and return JSON payloads.
//!
//! # Invariants
//! - `NotFound` messages never reveal whether an entity exists for another user.
//! - Integrity and storage failures are logged and reported with a generic
//!   message; internal detail never reaches the caller.
//! - Functions return errors instead of panicking.
//! - Tree payloads deeper than [`MAX_RESPONSE_TREE_DEPTH`] are refused with
//!   `BadRequest`; callers page deeper levels through `max_depth`.

use crate::model::note::{Note, NoteBody, NoteId, NoteWithTopic};
use crate::model::topic::{Topic, TopicDeletion, TopicId, TopicTree};
use crate::repo::note_repo::SqliteNoteRepository;
use crate::repo::topic_repo::SqliteTopicRepository;
use crate::repo::RepoError;
use crate::service::note_service::{NoteService, NoteServiceError};
use crate::service::topic_service::{TopicService, TopicServiceError};
use crate::service::ErrorKind;
use log::error;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Deepest topic tree [`TopicNoteApi::handle`] serializes into a payload.
pub const MAX_RESPONSE_TREE_DEPTH: usize = 256;

/// Response class of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorClass {
    BadRequest,
    NotFound,
    Internal,
}

impl From<ErrorKind> for ApiErrorClass {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Validation | ErrorKind::InvalidOperation => Self::BadRequest,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Integrity | ErrorKind::Storage => Self::Internal,
        }
    }
}

/// Caller-facing error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub class: ApiErrorClass,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            class: ApiErrorClass::BadRequest,
            message: message.into(),
        }
    }

    fn from_failure(kind: ErrorKind, err: &dyn Error) -> Self {
        let class = ApiErrorClass::from(kind);
        if class == ApiErrorClass::Internal {
            error!(
                "event=api_request module=api status=error error_kind={kind:?} error={err}"
            );
            return Self {
                class,
                message: INTERNAL_ERROR_MESSAGE.to_string(),
            };
        }
        Self {
            class,
            message: err.to_string(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.class, self.message)
    }
}

impl Error for ApiError {}

impl From<TopicServiceError> for ApiError {
    fn from(value: TopicServiceError) -> Self {
        Self::from_failure(value.kind(), &value)
    }
}

impl From<NoteServiceError> for ApiError {
    fn from(value: NoteServiceError) -> Self {
        Self::from_failure(value.kind(), &value)
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::from_failure(value.kind(), &value)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::from_failure(ErrorKind::Storage, &value)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// One serialized use-case call, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    RootTopics {
        #[serde(default)]
        max_depth: Option<usize>,
    },
    Topic {
        topic_id: TopicId,
        #[serde(default)]
        max_depth: Option<usize>,
    },
    Subtopics {
        topic_id: TopicId,
    },
    Breadcrumbs {
        topic_id: TopicId,
    },
    CreateTopic {
        name: String,
        #[serde(default)]
        parent_id: Option<TopicId>,
    },
    RenameTopic {
        topic_id: TopicId,
        name: String,
    },
    MoveTopic {
        topic_id: TopicId,
        #[serde(default)]
        parent_id: Option<TopicId>,
    },
    DeleteTopic {
        topic_id: TopicId,
    },
    SearchTopics {
        #[serde(default)]
        query: Option<String>,
    },
    CreateNote {
        name: String,
        body: NoteBody,
        topic_id: TopicId,
    },
    UpdateNote {
        note_id: NoteId,
        name: String,
        body: NoteBody,
        topic_id: TopicId,
    },
    NotesByTopic {
        topic_id: TopicId,
    },
    Note {
        note_id: NoteId,
    },
    DeleteNote {
        note_id: NoteId,
    },
}

/// Connection-scoped entry point for every use case.
pub struct TopicNoteApi<'conn> {
    conn: &'conn Connection,
}

impl<'conn> TopicNoteApi<'conn> {
    /// Wraps a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn root_topics(&self, user: &str, max_depth: Option<usize>) -> ApiResult<Vec<TopicTree>> {
        self.with_topics(user, |service, user| {
            service.root_topics_with_depth(user, max_depth)
        })
    }

    pub fn topic(
        &self,
        user: &str,
        topic_id: TopicId,
        max_depth: Option<usize>,
    ) -> ApiResult<TopicTree> {
        self.with_topics(user, |service, user| {
            service.topic_by_id_with_depth(user, topic_id, max_depth)
        })
    }

    pub fn subtopics(&self, user: &str, topic_id: TopicId) -> ApiResult<Vec<Topic>> {
        self.with_topics(user, |service, user| service.subtopics(user, topic_id))
    }

    pub fn breadcrumbs(&self, user: &str, topic_id: TopicId) -> ApiResult<Vec<Topic>> {
        self.with_topics(user, |service, user| {
            service.breadcrumb_trail(user, topic_id)
        })
    }

    pub fn create_topic(
        &self,
        user: &str,
        name: &str,
        parent_id: Option<TopicId>,
    ) -> ApiResult<Topic> {
        self.with_topics(user, |service, user| {
            service.create_topic(user, name, parent_id)
        })
    }

    pub fn rename_topic(&self, user: &str, topic_id: TopicId, name: &str) -> ApiResult<Topic> {
        self.with_topics(user, |service, user| {
            service.rename_topic(user, topic_id, name)
        })
    }

    pub fn move_topic(
        &self,
        user: &str,
        topic_id: TopicId,
        parent_id: Option<TopicId>,
    ) -> ApiResult<Topic> {
        self.with_topics(user, |service, user| {
            service.move_topic(user, topic_id, parent_id)
        })
    }

    pub fn delete_topic(&self, user: &str, topic_id: TopicId) -> ApiResult<TopicDeletion> {
        self.with_topics(user, |service, user| service.delete_topic(user, topic_id))
    }

    pub fn search_topics(&self, user: &str, query: Option<&str>) -> ApiResult<Vec<Topic>> {
        self.with_topics(user, |service, user| service.search_topics(user, query))
    }

    pub fn create_note(
        &self,
        user: &str,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> ApiResult<Note> {
        self.with_notes(user, |service, user| {
            service.create_note(user, name, body, topic_id)
        })
    }

    pub fn update_note(
        &self,
        user: &str,
        note_id: NoteId,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> ApiResult<Note> {
        self.with_notes(user, |service, user| {
            service.update_note(user, note_id, name, body, topic_id)
        })
    }

    pub fn notes_by_topic(&self, user: &str, topic_id: TopicId) -> ApiResult<Vec<Note>> {
        self.with_notes(user, |service, user| service.notes_by_topic(user, topic_id))
    }

    pub fn note(&self, user: &str, note_id: NoteId) -> ApiResult<NoteWithTopic> {
        self.with_notes(user, |service, user| service.note_by_id(user, note_id))
    }

    pub fn delete_note(&self, user: &str, note_id: NoteId) -> ApiResult<()> {
        self.with_notes(user, |service, user| service.delete_note(user, note_id))
    }

    /// Executes one serialized request and returns its JSON payload.
    ///
    /// `delete_note` answers with `{"note_id": ...}` since the operation has
    /// no entity to return. Tree answers fail with `BadRequest` when a tree is
    /// deeper than [`MAX_RESPONSE_TREE_DEPTH`].
    pub fn handle(&self, user: &str, request: ApiRequest) -> ApiResult<Value> {
        let payload = match request {
            ApiRequest::RootTopics { max_depth } => {
                let trees = self.root_topics(user, max_depth)?;
                for tree in &trees {
                    ensure_payload_depth(tree)?;
                }
                serde_json::to_value(trees)?
            }
            ApiRequest::Topic {
                topic_id,
                max_depth,
            } => {
                let tree = self.topic(user, topic_id, max_depth)?;
                ensure_payload_depth(&tree)?;
                serde_json::to_value(tree)?
            }
            ApiRequest::Subtopics { topic_id } => {
                serde_json::to_value(self.subtopics(user, topic_id)?)?
            }
            ApiRequest::Breadcrumbs { topic_id } => {
                serde_json::to_value(self.breadcrumbs(user, topic_id)?)?
            }
            ApiRequest::CreateTopic { name, parent_id } => {
                serde_json::to_value(self.create_topic(user, &name, parent_id)?)?
            }
            ApiRequest::RenameTopic { topic_id, name } => {
                serde_json::to_value(self.rename_topic(user, topic_id, &name)?)?
            }
            ApiRequest::MoveTopic {
                topic_id,
                parent_id,
            } => serde_json::to_value(self.move_topic(user, topic_id, parent_id)?)?,
            ApiRequest::DeleteTopic { topic_id } => {
                serde_json::to_value(self.delete_topic(user, topic_id)?)?
            }
            ApiRequest::SearchTopics { query } => {
                serde_json::to_value(self.search_topics(user, query.as_deref())?)?
            }
            ApiRequest::CreateNote {
                name,
                body,
                topic_id,
            } => serde_json::to_value(self.create_note(user, &name, &body, topic_id)?)?,
            ApiRequest::UpdateNote {
                note_id,
                name,
                body,
                topic_id,
            } => serde_json::to_value(self.update_note(user, note_id, &name, &body, topic_id)?)?,
            ApiRequest::NotesByTopic { topic_id } => {
                serde_json::to_value(self.notes_by_topic(user, topic_id)?)?
            }
            ApiRequest::Note { note_id } => serde_json::to_value(self.note(user, note_id)?)?,
            ApiRequest::DeleteNote { note_id } => {
                self.delete_note(user, note_id)?;
                serde_json::json!({ "note_id": note_id })
            }
        };
        Ok(payload)
    }

    fn with_topics<T, F>(&self, user: &str, op: F) -> ApiResult<T>
    where
        F: FnOnce(&TopicService<SqliteTopicRepository<'conn>>, &str) -> Result<T, TopicServiceError>,
    {
        let user = require_user(user)?;
        let service = TopicService::new(SqliteTopicRepository::try_new(self.conn)?);
        op(&service, user).map_err(ApiError::from)
    }

    fn with_notes<T, F>(&self, user: &str, op: F) -> ApiResult<T>
    where
        F: FnOnce(&NoteService<SqliteNoteRepository<'conn>>, &str) -> Result<T, NoteServiceError>,
    {
        let user = require_user(user)?;
        let service = NoteService::new(SqliteNoteRepository::try_new(self.conn)?);
        op(&service, user).map_err(ApiError::from)
    }
}

/// Rejects a blank acting user; any other id is used exactly as given.
fn require_user(user: &str) -> ApiResult<&str> {
    if user.trim().is_empty() {
        return Err(ApiError::bad_request("acting user must not be blank"));
    }
    Ok(user)
}

/// Serializing a tree recurses once per level.
fn ensure_payload_depth(tree: &TopicTree) -> ApiResult<()> {
    let depth = tree.depth();
    if depth > MAX_RESPONSE_TREE_DEPTH {
        return Err(ApiError::bad_request(format!(
            "topic tree is {depth} levels deep; request at most {MAX_RESPONSE_TREE_DEPTH} with max_depth"
        )));
    }
    Ok(())
}
