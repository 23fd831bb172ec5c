//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide note persistence APIs on top of the `notes` table.
//! - Resolve note ownership through the owning topic.
//!
//! # Invariants
//! - `body` is stored as serialized JSON and read back without reshaping.
//! - Owner-scoped reads join `topics` and filter by `topics.owner_id`.
//! - Topic listings are ordered most recently created first
//!   (`created_at DESC, rowid DESC`).

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::note::{Note, NoteBody, NoteId, NoteWithTopic};
use crate::model::topic::{TopicId, TopicSummary};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const NOTE_WITH_TOPIC_SELECT_SQL: &str = "SELECT
    n.id AS id,
    n.name AS name,
    n.body AS body,
    n.topic_id AS topic_id,
    n.created_at AS created_at,
    n.updated_at AS updated_at,
    t.name AS topic_name
FROM notes n
INNER JOIN topics t ON t.id = n.topic_id";

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Loads the summary of a topic owned by `owner_id`.
    fn topic_summary(&self, owner_id: &str, topic_id: TopicId)
        -> RepoResult<Option<TopicSummary>>;
    /// Inserts one note under `topic_id` and returns its stable id.
    fn insert_note(&self, topic_id: TopicId, name: &str, body: &NoteBody) -> RepoResult<NoteId>;
    /// Loads one note whose topic is owned by `owner_id`.
    fn get_note(&self, owner_id: &str, note_id: NoteId) -> RepoResult<Option<NoteWithTopic>>;
    /// Replaces name, body and topic of one note and bumps `updated_at`.
    fn update_note(
        &self,
        note_id: NoteId,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> RepoResult<()>;
    /// Lists notes of one topic, most recently created first.
    fn list_notes_by_topic(&self, topic_id: TopicId) -> RepoResult<Vec<Note>>;
    /// Deletes one note.
    fn delete_note(&self, note_id: NoteId) -> RepoResult<()>;
    /// Runs `op` inside one immediate transaction, rolling back on error.
    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "notes",
            &["id", "name", "body", "topic_id", "created_at", "updated_at"],
        )?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn topic_summary(
        &self,
        owner_id: &str,
        topic_id: TopicId,
    ) -> RepoResult<Option<TopicSummary>> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name
                 FROM topics
                 WHERE id = ?1
                   AND owner_id = ?2;",
                params![topic_id.to_string(), owner_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.map(|name| TopicSummary { id: topic_id, name }))
    }

    fn insert_note(&self, topic_id: TopicId, name: &str, body: &NoteBody) -> RepoResult<NoteId> {
        let note_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO notes (
                id,
                name,
                body,
                topic_id
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                note_id.to_string(),
                name,
                encode_body(body)?,
                topic_id.to_string(),
            ],
        )?;
        Ok(note_id)
    }

    fn get_note(&self, owner_id: &str, note_id: NoteId) -> RepoResult<Option<NoteWithTopic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_WITH_TOPIC_SELECT_SQL}
             WHERE n.id = ?1
               AND t.owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![note_id.to_string(), owner_id])?;
        if let Some(row) = rows.next()? {
            let note = parse_note_row(row)?;
            let topic = TopicSummary {
                id: note.topic_id,
                name: row.get("topic_name")?,
            };
            return Ok(Some(NoteWithTopic { note, topic }));
        }
        Ok(None)
    }

    fn update_note(
        &self,
        note_id: NoteId,
        name: &str,
        body: &NoteBody,
        topic_id: TopicId,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET name = ?2,
                 body = ?3,
                 topic_id = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                note_id.to_string(),
                name,
                encode_body(body)?,
                topic_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id));
        }
        Ok(())
    }

    fn list_notes_by_topic(&self, topic_id: TopicId) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                name,
                body,
                topic_id,
                created_at,
                updated_at
             FROM notes
             WHERE topic_id = ?1
             ORDER BY created_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([topic_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_note(&self, note_id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [note_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_id));
        }
        Ok(())
    }

    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = op()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let topic_id_text: String = row.get("topic_id")?;
    let body_text: String = row.get("body")?;

    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        name: row.get("name")?,
        body: decode_body(&body_text)?,
        topic_id: parse_uuid(&topic_id_text, "notes.topic_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn encode_body(body: &NoteBody) -> RepoResult<String> {
    serde_json::to_string(body)
        .map_err(|err| RepoError::InvalidData(format!("note body cannot be encoded: {err}")))
}

fn decode_body(value: &str) -> RepoResult<NoteBody> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in notes.body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{decode_body, encode_body};
    use crate::repo::RepoError;
    use serde_json::json;

    #[test]
    fn body_encoding_keeps_document_structure() {
        let body = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "héllo", "marks": [{"type": "bold"}]}]},
                {"type": "heading", "attrs": {"level": 2}, "content": []}
            ]
        });
        let encoded = encode_body(&body).unwrap();
        assert_eq!(decode_body(&encoded).unwrap(), body);
    }

    #[test]
    fn decode_rejects_corrupted_body() {
        let err = decode_body("{not json").unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("notes.body")));
    }
}
