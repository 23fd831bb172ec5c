use rusqlite::Connection;
use topicnote_core::db::open_db_in_memory;
use topicnote_core::{
    ErrorKind, SqliteTopicRepository, Topic, TopicService, TopicServiceError,
};
use uuid::Uuid;

const ALICE: &str = "alice";

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn topics(conn: &Connection) -> TopicService<SqliteTopicRepository<'_>> {
    TopicService::new(SqliteTopicRepository::try_new(conn).unwrap())
}

/// Builds the chain `A -> B -> C` with `A` at root level.
fn chain(service: &TopicService<SqliteTopicRepository<'_>>) -> (Topic, Topic, Topic) {
    let a = service.create_topic(ALICE, "A", None).unwrap();
    let b = service.create_topic(ALICE, "B", Some(a.id)).unwrap();
    let c = service.create_topic(ALICE, "C", Some(b.id)).unwrap();
    (a, b, c)
}

fn parent_of(conn: &Connection, topic: &Topic) -> Option<String> {
    conn.query_row(
        "SELECT parent_id FROM topics WHERE id = ?1;",
        [topic.id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn move_under_descendant_is_rejected_and_leaves_tree_unchanged() {
    let conn = setup();
    let service = topics(&conn);
    let (a, b, c) = chain(&service);

    let err = service.move_topic(ALICE, a.id, Some(c.id)).unwrap_err();
    assert!(matches!(
        err,
        TopicServiceError::CyclicMove { topic_id, parent_id }
            if topic_id == a.id && parent_id == c.id
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    assert_eq!(parent_of(&conn, &a), None);
    let roots = service.root_topics(ALICE).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].ids(), vec![a.id, b.id, c.id]);

    let err = service.move_topic(ALICE, a.id, Some(b.id)).unwrap_err();
    assert!(matches!(err, TopicServiceError::CyclicMove { .. }));
}

#[test]
fn move_under_itself_is_rejected() {
    let conn = setup();
    let service = topics(&conn);
    let (a, _, _) = chain(&service);

    let err = service.move_topic(ALICE, a.id, Some(a.id)).unwrap_err();
    assert!(matches!(err, TopicServiceError::SelfParent(id) if id == a.id));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(parent_of(&conn, &a), None);
}

#[test]
fn move_requires_existing_topic_and_parent() {
    let conn = setup();
    let service = topics(&conn);
    let (a, _, c) = chain(&service);
    let missing = Uuid::new_v4();

    let err = service.move_topic(ALICE, missing, Some(a.id)).unwrap_err();
    assert!(matches!(err, TopicServiceError::TopicNotFound(id) if id == missing));

    let err = service.move_topic(ALICE, c.id, Some(missing)).unwrap_err();
    assert!(matches!(err, TopicServiceError::ParentNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn move_descendant_to_root_and_back() {
    let conn = setup();
    let service = topics(&conn);
    let (a, b, c) = chain(&service);
    conn.execute(
        "UPDATE topics SET updated_at = 0 WHERE id = ?1;",
        [c.id.to_string()],
    )
    .unwrap();

    let moved = service.move_topic(ALICE, c.id, None).unwrap();
    assert!(moved.is_root());
    assert!(moved.updated_at > 0);

    let roots = service.root_topics(ALICE).unwrap();
    let root_ids: Vec<_> = roots.iter().map(|tree| tree.topic.id).collect();
    assert_eq!(root_ids, vec![a.id, c.id]);

    let moved = service.move_topic(ALICE, c.id, Some(a.id)).unwrap();
    assert_eq!(moved.parent_id, Some(a.id));
    let children: Vec<_> = service
        .subtopics(ALICE, a.id)
        .unwrap()
        .into_iter()
        .map(|topic| topic.id)
        .collect();
    assert_eq!(children, vec![b.id, c.id]);
}

#[test]
fn moved_topic_is_appended_after_new_siblings_and_keeps_its_subtree() {
    let conn = setup();
    let service = topics(&conn);

    let left = service.create_topic(ALICE, "Left", None).unwrap();
    let right = service.create_topic(ALICE, "Right", None).unwrap();
    let l1 = service.create_topic(ALICE, "L1", Some(left.id)).unwrap();
    let l2 = service.create_topic(ALICE, "L2", Some(left.id)).unwrap();
    let r1 = service.create_topic(ALICE, "R1", Some(right.id)).unwrap();
    let r1_child = service.create_topic(ALICE, "R1 child", Some(r1.id)).unwrap();

    let moved = service.move_topic(ALICE, r1.id, Some(left.id)).unwrap();
    assert_eq!(moved.sort_order, 2);

    let tree = service.topic_by_id(ALICE, left.id).unwrap();
    let order: Vec<_> = tree.subtopics.iter().map(|child| child.topic.id).collect();
    assert_eq!(order, vec![l1.id, l2.id, r1.id]);
    assert_eq!(tree.subtopics[2].subtopics[0].topic.id, r1_child.id);
    assert!(service.subtopics(ALICE, right.id).unwrap().is_empty());
}

#[test]
fn move_through_corrupted_cycle_reports_integrity_error() {
    let conn = setup();
    let service = topics(&conn);
    let (a, b, _) = chain(&service);
    let outsider = service.create_topic(ALICE, "Outsider", None).unwrap();

    // A <-> B loop, detached from every root.
    conn.execute(
        "UPDATE topics SET parent_id = ?1 WHERE id = ?2;",
        [b.id.to_string(), a.id.to_string()],
    )
    .unwrap();

    let err = service.move_topic(ALICE, outsider.id, Some(b.id)).unwrap_err();
    assert!(matches!(err, TopicServiceError::HierarchyCycle(_)));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(parent_of(&conn, &outsider), None);
}

#[test]
fn move_under_topic_with_missing_ancestor_reports_broken_chain() {
    let conn = setup();
    let service = topics(&conn);
    let (a, _, c) = chain(&service);
    let outsider = service.create_topic(ALICE, "Outsider", None).unwrap();
    let ghost = Uuid::new_v4();

    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute(
        "UPDATE topics SET parent_id = ?1 WHERE id = ?2;",
        [ghost.to_string(), a.id.to_string()],
    )
    .unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    let err = service.move_topic(ALICE, outsider.id, Some(c.id)).unwrap_err();
    assert!(matches!(err, TopicServiceError::BrokenParentChain(id) if id == ghost));
    assert_eq!(err.kind(), ErrorKind::Integrity);
}
