use rusqlite::Connection;
use topicnote_core::db::migrations::{latest_version, schema_version};
use topicnote_core::db::{open_db, open_db_in_memory, table_exists, table_has_column, DbError};
use topicnote_core::{RepoError, SqliteNoteRepository, SqliteTopicRepository};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert!(table_exists(&conn, "topics").unwrap());
    assert!(table_exists(&conn, "notes").unwrap());
    for column in ["id", "name", "owner_id", "parent_id", "sort_order", "created_at", "updated_at"] {
        assert!(table_has_column(&conn, "topics", column).unwrap(), "topics.{column}");
    }
    for column in ["id", "name", "body", "topic_id", "created_at", "updated_at"] {
        assert!(table_has_column(&conn, "notes", column).unwrap(), "notes.{column}");
    }
}

#[test]
fn opened_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO notes (id, name, body, topic_id) VALUES ('n', 'orphan', '{}', 'missing');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topicnote.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO topics (id, name, owner_id) VALUES ('t1', 'Kept', 'alice');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM topics;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_reject_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteTopicRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
    assert!(SqliteNoteRepository::try_new(&conn).is_err());
}

#[test]
fn repositories_reject_missing_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "user_version", latest_version())
        .unwrap();

    let err = SqliteTopicRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("topics")));
}
