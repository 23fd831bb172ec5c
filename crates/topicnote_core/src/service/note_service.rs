//! Note use-case service.
//!
//! # Responsibility
//! - Attach notes to topics owned by the acting user.
//! - Enforce ownership through the owning topic on every read and write.
//!
//! # Invariants
//! - A note is never readable or writable by anyone but its topic's owner.
//! - Moving a note requires both the current and the target topic to be owned.

use super::{normalize_name, ErrorKind};
use crate::model::note::{Note, NoteBody, NoteId, NoteWithTopic};
use crate::model::topic::TopicId;
use crate::repo::note_repo::NoteRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from note service operations.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Note does not exist for the acting user.
    NoteNotFound(NoteId),
    /// Topic does not exist for the acting user.
    TopicNotFound(TopicId),
    /// Write succeeded but the follow-up read could not load it.
    InconsistentState(&'static str),
    /// Repository-level failure.
    Repo(RepoError),
}

impl NoteServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName => ErrorKind::Validation,
            Self::NoteNotFound(_) | Self::TopicNotFound(_) => ErrorKind::NotFound,
            Self::InconsistentState(_) => ErrorKind::Integrity,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "note name must not be blank"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::InconsistentState(message) => write!(f, "inconsistent state: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NoteNotFound(note_id) => Self::NoteNotFound(note_id),
            RepoError::TopicNotFound(topic_id) => Self::TopicNotFound(topic_id),
            other => Self::Repo(other),
        }
    }
}

/// Note use-case facade.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one note under a topic owned by `owner_id`.
    pub fn create_note(
        &self,
        owner_id: &str,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> Result<Note, NoteServiceError> {
        let name = normalize_name(name).ok_or(NoteServiceError::InvalidName)?;
        let note = self.repo.atomically(|| {
            self.require_topic(owner_id, topic_id)?;
            let note_id = self.repo.insert_note(topic_id, name.as_str(), body)?;
            self.reload(owner_id, note_id, "created note missing")
        })?;
        info!(
            "event=note_create module=note_service status=ok note_id={} topic_id={}",
            note.id, note.topic_id
        );
        Ok(note)
    }

    /// Replaces name, body and topic of one note.
    pub fn update_note(
        &self,
        owner_id: &str,
        note_id: NoteId,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> Result<Note, NoteServiceError> {
        let name = normalize_name(name).ok_or(NoteServiceError::InvalidName)?;
        let note = self.repo.atomically(|| {
            let current = self
                .repo
                .get_note(owner_id, note_id)?
                .ok_or(NoteServiceError::NoteNotFound(note_id))?;
            if current.note.topic_id != topic_id {
                self.require_topic(owner_id, topic_id)?;
            }
            self.repo
                .update_note(note_id, name.as_str(), body, topic_id)?;
            self.reload(owner_id, note_id, "updated note missing")
        })?;
        info!(
            "event=note_update module=note_service status=ok note_id={} topic_id={}",
            note.id, note.topic_id
        );
        Ok(note)
    }

    /// Lists notes of one owned topic, most recently created first.
    pub fn notes_by_topic(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> Result<Vec<Note>, NoteServiceError> {
        self.require_topic(owner_id, topic_id)?;
        self.repo.list_notes_by_topic(topic_id).map_err(Into::into)
    }

    /// Loads one note with its topic summary.
    pub fn note_by_id(
        &self,
        owner_id: &str,
        note_id: NoteId,
    ) -> Result<NoteWithTopic, NoteServiceError> {
        self.repo
            .get_note(owner_id, note_id)?
            .ok_or(NoteServiceError::NoteNotFound(note_id))
    }

    /// Deletes one note.
    pub fn delete_note(&self, owner_id: &str, note_id: NoteId) -> Result<(), NoteServiceError> {
        self.repo.atomically(|| {
            self.repo
                .get_note(owner_id, note_id)?
                .ok_or(NoteServiceError::NoteNotFound(note_id))?;
            self.repo.delete_note(note_id).map_err(NoteServiceError::from)
        })?;
        info!("event=note_delete module=note_service status=ok note_id={note_id}");
        Ok(())
    }

    fn require_topic(&self, owner_id: &str, topic_id: TopicId) -> Result<(), NoteServiceError> {
        match self.repo.topic_summary(owner_id, topic_id)? {
            Some(_) => Ok(()),
            None => Err(NoteServiceError::TopicNotFound(topic_id)),
        }
    }

    fn reload(
        &self,
        owner_id: &str,
        note_id: NoteId,
        context: &'static str,
    ) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(owner_id, note_id)?
            .map(|detail| detail.note)
            .ok_or(NoteServiceError::InconsistentState(context))
    }
}
