//! Topic repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide owner-scoped persistence APIs for the topic forest.
//! - Keep SQL details and sibling ordering inside the repository boundary.
//!
//! # Invariants
//! - Every statement filters by `owner_id`; another owner's rows are invisible.
//! - Sibling listing is deterministic: `sort_order ASC, rowid ASC`.
//! - Deleting a topic removes its subtree deepest level first; notes follow
//!   their topic through `ON DELETE CASCADE`.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::topic::{Topic, TopicId};
use rusqlite::{params, Connection, Row, Rows, Transaction, TransactionBehavior};
use uuid::Uuid;

const TOPIC_SELECT_SQL: &str = "SELECT
    id,
    name,
    owner_id,
    parent_id,
    sort_order,
    created_at,
    updated_at
FROM topics";

/// Sizes of one topic subtree, the root topic included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtreeCounts {
    pub topics: u64,
    pub notes: u64,
}

/// Repository interface for topic operations.
pub trait TopicRepository {
    /// Inserts one topic appended after its future siblings.
    fn insert_topic(
        &self,
        owner_id: &str,
        parent_id: Option<TopicId>,
        name: &str,
    ) -> RepoResult<Topic>;
    /// Loads one topic owned by `owner_id`.
    fn get_topic(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<Option<Topic>>;
    /// Lists every topic of one owner in sibling order.
    fn list_topics(&self, owner_id: &str) -> RepoResult<Vec<Topic>>;
    /// Lists direct children of `parent_id`; `None` lists root-level topics.
    fn list_children(
        &self,
        owner_id: &str,
        parent_id: Option<TopicId>,
    ) -> RepoResult<Vec<Topic>>;
    /// Renames one topic.
    fn rename_topic(&self, owner_id: &str, topic_id: TopicId, name: &str) -> RepoResult<()>;
    /// Re-parents one topic and appends it after its new siblings.
    ///
    /// Does not check for cycles; callers validate the target first.
    fn set_parent(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        parent_id: Option<TopicId>,
    ) -> RepoResult<()>;
    /// Counts topics and notes in the subtree rooted at `topic_id`.
    fn subtree_counts(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<SubtreeCounts>;
    /// Deletes one topic with its descendants; notes follow by cascade.
    fn delete_topic(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<()>;
    /// Lists up to `limit` topics whose name contains `needle` (case-sensitive).
    fn search_topics(
        &self,
        owner_id: &str,
        needle: Option<&str>,
        limit: u32,
    ) -> RepoResult<Vec<Topic>>;
    /// Runs `op` inside one immediate transaction, rolling back on error.
    fn atomically<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed topic repository.
pub struct SqliteTopicRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTopicRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            "topics",
            &[
                "id",
                "name",
                "owner_id",
                "parent_id",
                "sort_order",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl TopicRepository for SqliteTopicRepository<'_> {
    fn insert_topic(
        &self,
        owner_id: &str,
        parent_id: Option<TopicId>,
        name: &str,
    ) -> RepoResult<Topic> {
        let topic_id = Uuid::new_v4();
        let sort_order = next_sort_order(self.conn, owner_id, parent_id, None)?;
        self.conn.execute(
            "INSERT INTO topics (
                id,
                name,
                owner_id,
                parent_id,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                topic_id.to_string(),
                name,
                owner_id,
                parent_id.map(|value| value.to_string()),
                sort_order,
            ],
        )?;
        self.get_topic(owner_id, topic_id)?
            .ok_or(RepoError::TopicNotFound(topic_id))
    }

    fn get_topic(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<Option<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL}
             WHERE id = ?1
               AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![topic_id.to_string(), owner_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_topic_row(row)?));
        }
        Ok(None)
    }

    fn list_topics(&self, owner_id: &str) -> RepoResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY sort_order ASC, rowid ASC;"
        ))?;
        let rows = stmt.query([owner_id])?;
        collect_topics(rows)
    }

    fn list_children(
        &self,
        owner_id: &str,
        parent_id: Option<TopicId>,
    ) -> RepoResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL}
             WHERE owner_id = ?1
               AND parent_id IS ?2
             ORDER BY sort_order ASC, rowid ASC;"
        ))?;
        let rows = stmt.query(params![
            owner_id,
            parent_id.map(|value| value.to_string())
        ])?;
        collect_topics(rows)
    }

    fn rename_topic(&self, owner_id: &str, topic_id: TopicId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE topics
             SET name = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND owner_id = ?2;",
            params![topic_id.to_string(), owner_id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::TopicNotFound(topic_id));
        }
        Ok(())
    }

    fn set_parent(
        &self,
        owner_id: &str,
        topic_id: TopicId,
        parent_id: Option<TopicId>,
    ) -> RepoResult<()> {
        let sort_order = next_sort_order(self.conn, owner_id, parent_id, Some(topic_id))?;
        let changed = self.conn.execute(
            "UPDATE topics
             SET parent_id = ?3,
                 sort_order = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND owner_id = ?2;",
            params![
                topic_id.to_string(),
                owner_id,
                parent_id.map(|value| value.to_string()),
                sort_order,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::TopicNotFound(topic_id));
        }
        Ok(())
    }

    fn subtree_counts(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<SubtreeCounts> {
        // UNION (not UNION ALL) keeps the walk finite on a corrupted cyclic chain.
        let (topics, notes): (i64, i64) = self.conn.query_row(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM topics
                WHERE id = ?1
                  AND owner_id = ?2
                UNION
                SELECT child.id
                FROM topics child
                INNER JOIN subtree parent ON child.parent_id = parent.id
                WHERE child.owner_id = ?2
            )
            SELECT
                (SELECT COUNT(*) FROM subtree),
                (SELECT COUNT(*) FROM notes WHERE topic_id IN (SELECT id FROM subtree));",
            params![topic_id.to_string(), owner_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(SubtreeCounts {
            topics: count_to_u64(topics)?,
            notes: count_to_u64(notes)?,
        })
    }

    fn delete_topic(&self, owner_id: &str, topic_id: TopicId) -> RepoResult<()> {
        // Deepest rows go first, so no delete cascades into a child topic and
        // SQLite never nests cascades once per level. The depth bound keeps
        // the walk finite on a corrupted cyclic chain.
        let mut select = self.conn.prepare(
            "WITH RECURSIVE subtree(id, depth) AS (
                SELECT id, 0
                FROM topics
                WHERE id = ?1
                  AND owner_id = ?2
                UNION ALL
                SELECT child.id, parent.depth + 1
                FROM topics child
                INNER JOIN subtree parent ON child.parent_id = parent.id
                WHERE child.owner_id = ?2
                  AND parent.depth < (SELECT COUNT(*) FROM topics WHERE owner_id = ?2)
            )
            SELECT id
            FROM subtree
            ORDER BY depth DESC;",
        )?;
        let ids = select
            .query_map(params![topic_id.to_string(), owner_id], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Err(RepoError::TopicNotFound(topic_id));
        }

        let mut delete = self.conn.prepare(
            "DELETE FROM topics
             WHERE id = ?1
               AND owner_id = ?2;",
        )?;
        for id in &ids {
            delete.execute(params![id, owner_id])?;
        }
        Ok(())
    }

    fn search_topics(
        &self,
        owner_id: &str,
        needle: Option<&str>,
        limit: u32,
    ) -> RepoResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL}
             WHERE owner_id = ?1
               AND (?2 IS NULL OR instr(name, ?2) > 0)
             ORDER BY rowid ASC
             LIMIT ?3;"
        ))?;
        let rows = stmt.query(params![owner_id, needle, i64::from(limit)])?;
        collect_topics(rows)
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

fn next_sort_order(
    conn: &Connection,
    owner_id: &str,
    parent_id: Option<TopicId>,
    exclude: Option<TopicId>,
) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM topics
         WHERE owner_id = ?1
           AND parent_id IS ?2
           AND id IS NOT ?3;",
        params![
            owner_id,
            parent_id.map(|value| value.to_string()),
            exclude.map(|value| value.to_string()),
        ],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn collect_topics(mut rows: Rows<'_>) -> RepoResult<Vec<Topic>> {
    let mut topics = Vec::new();
    while let Some(row) = rows.next()? {
        topics.push(parse_topic_row(row)?);
    }
    Ok(topics)
}

fn parse_topic_row(row: &Row<'_>) -> RepoResult<Topic> {
    let id_text: String = row.get("id")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "topics.parent_id"))
        .transpose()?;

    Ok(Topic {
        id: parse_uuid(&id_text, "topics.id")?,
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        parent_id,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn count_to_u64(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}
