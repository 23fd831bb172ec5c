use serde_json::{json, Value};
use topicnote_core::db::open_db_in_memory;
use topicnote_core::{ApiErrorClass, ApiRequest, TopicNoteApi, MAX_RESPONSE_TREE_DEPTH};
use uuid::Uuid;

fn request(value: Value) -> ApiRequest {
    serde_json::from_value(value).unwrap()
}

fn id_of(payload: &Value) -> Uuid {
    payload["id"].as_str().unwrap().parse().unwrap()
}

#[test]
fn handle_drives_full_topic_and_note_flow() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);

    let root = api
        .handle("alice", request(json!({"op": "create_topic", "name": "Root"})))
        .unwrap();
    let root_id = id_of(&root);
    let child = api
        .handle(
            "alice",
            request(json!({"op": "create_topic", "name": "Child", "parent_id": root_id})),
        )
        .unwrap();
    assert_eq!(child["parent_id"], json!(root_id));

    let roots = api
        .handle("alice", request(json!({"op": "root_topics"})))
        .unwrap();
    assert_eq!(roots[0]["name"], "Root");
    assert_eq!(roots[0]["subtopics"][0]["name"], "Child");

    let body = json!({"type": "doc", "content": [{"type": "text", "text": "hi"}]});
    let note = api
        .handle(
            "alice",
            request(json!({
                "op": "create_note",
                "name": "Hello",
                "body": body,
                "topic_id": id_of(&child),
            })),
        )
        .unwrap();
    assert_eq!(note["body"], body);

    let detail = api
        .handle("alice", request(json!({"op": "note", "note_id": id_of(&note)})))
        .unwrap();
    assert_eq!(detail["topic"]["name"], "Child");
    assert_eq!(detail["name"], "Hello");

    let trail = api
        .handle(
            "alice",
            request(json!({"op": "breadcrumbs", "topic_id": id_of(&child)})),
        )
        .unwrap();
    assert_eq!(trail.as_array().unwrap().len(), 2);

    let deletion = api
        .handle("alice", request(json!({"op": "delete_topic", "topic_id": root_id})))
        .unwrap();
    assert_eq!(deletion["deleted_topics"], 2);
    assert_eq!(deletion["deleted_notes"], 1);
}

#[test]
fn errors_map_to_response_classes() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let topic = api.create_topic("alice", "Mine", None).unwrap();

    let err = api.create_topic("alice", "   ", None).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::BadRequest);

    let err = api.move_topic("alice", topic.id, Some(topic.id)).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::BadRequest);

    let err = api.topic("bob", topic.id, None).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::NotFound);

    let err = api.topic("alice", Uuid::new_v4(), None).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::NotFound);

    let err = api.search_topics("  ", None).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::BadRequest);
}

#[test]
fn not_found_message_is_identical_for_absent_and_foreign() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let topic = api.create_topic("alice", "Mine", None).unwrap();

    let foreign = api.subtopics("bob", topic.id).unwrap_err();
    api.delete_topic("alice", topic.id).unwrap();
    let absent = api.subtopics("bob", topic.id).unwrap_err();

    assert_eq!(foreign, absent);
}

#[test]
fn integrity_failures_are_internal_without_detail() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let a = api.create_topic("alice", "A", None).unwrap();
    let b = api.create_topic("alice", "B", Some(a.id)).unwrap();
    conn.execute(
        "UPDATE topics SET parent_id = ?1 WHERE id = ?2;",
        [b.id.to_string(), a.id.to_string()],
    )
    .unwrap();

    let err = api.breadcrumbs("alice", b.id).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::Internal);
    assert!(!err.message.contains(&a.id.to_string()));
    assert!(!err.message.contains(&b.id.to_string()));

    let serialized = serde_json::to_value(&err).unwrap();
    assert_eq!(serialized["class"], "internal");
}

#[test]
fn delete_note_acknowledges_with_note_id() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let topic = api.create_topic("alice", "Inbox", None).unwrap();
    let note = api.create_note("alice", "n", &json!({}), topic.id).unwrap();

    let ack = api
        .handle("alice", ApiRequest::DeleteNote { note_id: note.id })
        .unwrap();
    assert_eq!(ack, json!({"note_id": note.id}));
    assert!(api.notes_by_topic("alice", topic.id).unwrap().is_empty());
}

#[test]
fn acting_user_id_is_not_trimmed() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let topic = api.create_topic("alice ", "Spaced", None).unwrap();
    assert_eq!(topic.owner_id, "alice ");

    let err = api.topic("alice", topic.id, None).unwrap_err();
    assert_eq!(err.class, ApiErrorClass::NotFound);
    assert!(api.root_topics("alice", None).unwrap().is_empty());
    assert_eq!(api.root_topics("alice ", None).unwrap().len(), 1);
}

#[test]
fn tree_payload_deeper_than_cap_needs_max_depth() {
    let conn = open_db_in_memory().unwrap();
    let api = TopicNoteApi::new(&conn);
    let root = api.create_topic("alice", "level 0", None).unwrap();
    let mut parent = root.id;
    for level in 1..=MAX_RESPONSE_TREE_DEPTH + 1 {
        parent = api
            .create_topic("alice", &format!("level {level}"), Some(parent))
            .unwrap()
            .id;
    }

    let err = api
        .handle("alice", request(json!({"op": "root_topics"})))
        .unwrap_err();
    assert_eq!(err.class, ApiErrorClass::BadRequest);
    let err = api
        .handle("alice", request(json!({"op": "topic", "topic_id": root.id})))
        .unwrap_err();
    assert_eq!(err.class, ApiErrorClass::BadRequest);

    let bounded = api
        .handle(
            "alice",
            request(json!({"op": "topic", "topic_id": root.id, "max_depth": 2})),
        )
        .unwrap();
    assert_eq!(bounded["subtopics"][0]["subtopics"][0]["name"], "level 2");
    assert!(bounded["subtopics"][0]["subtopics"][0]["subtopics"]
        .as_array()
        .unwrap()
        .is_empty());

    let at_cap = api
        .handle(
            "alice",
            request(json!({
                "op": "root_topics",
                "max_depth": MAX_RESPONSE_TREE_DEPTH,
            })),
        )
        .unwrap();
    assert_eq!(at_cap[0]["name"], "level 0");

    let leaf = api.topic("alice", parent, None).unwrap();
    assert_eq!(leaf.depth(), 0);
}
