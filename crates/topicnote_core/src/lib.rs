//! Core domain logic for topicnote.
//! This crate is the single source of truth for topic tree and note invariants.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{
    ApiError, ApiErrorClass, ApiRequest, ApiResult, TopicNoteApi, MAX_RESPONSE_TREE_DEPTH,
};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteBody, NoteId, NoteWithTopic};
pub use model::topic::{Topic, TopicDeletion, TopicId, TopicSummary, TopicTree};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::topic_repo::{SqliteTopicRepository, SubtreeCounts, TopicRepository};
pub use repo::{RepoError, RepoResult};
pub use service::note_service::{NoteService, NoteServiceError};
pub use service::topic_service::{TopicService, TopicServiceError, TOPIC_SEARCH_LIMIT};
pub use service::ErrorKind;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
