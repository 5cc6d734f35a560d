mod common;

use common::{engine, row, MockSession};
use dbop::sql::BindValue;
use dbop::{Model, ModelRef, ModelSchema, Params, Record};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[tokio::test]
async fn fetches_by_key_under_main_model_name() {
    let dbop = engine();
    let mut session = MockSession::new().rows(vec![row(json!({"id": 150, "title": "a", "editor_note": "n", "position": 2}))]);

    let payload = dbop
        .detail(&mut session, "Article".into(), &Params::new().with("Id", 150u64), None)
        .await
        .unwrap();

    let q = &session.statements[0];
    assert_eq!(
        q.sql,
        concat!(
            r#"SELECT "article"."id", "article"."title", "article"."editor_note", "article"."position", "#,
            r#""article"."created_at", "article"."updated_at" FROM "article" WHERE "article"."id" = ? LIMIT 1 OFFSET 0"#
        )
    );
    assert_eq!(q.params, vec![BindValue::U64(150)]);

    // list-only redaction does not apply here
    let body = serde_json::to_value(&payload).unwrap();
    assert_eq!(body["Article"]["EditorNote"], json!("n"));
    assert_eq!(body["Article"]["Position"], json!(2));
}

#[tokio::test]
async fn detail_hidden_fields_are_redacted() {
    let dbop = engine();
    let mut session = MockSession::new().rows(vec![row(json!({"id": 9, "body": "b", "secret": "s"}))]);

    let payload = dbop
        .detail(&mut session, "Note".into(), &Params::new().with("Id", 9u64), None)
        .await
        .unwrap();

    assert!(!session.sql()[0].contains("secret"));
    assert_eq!(payload.key, "Note");
    assert!(payload.item.get("Secret").is_none());
    assert_eq!(payload.item["Body"], json!("b"));
}

#[tokio::test]
async fn missing_row_is_not_found() {
    let dbop = engine();
    let mut session = MockSession::new();

    let err = dbop
        .detail(&mut session, "Note".into(), &Params::new().with("Id", 1u64), None)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "ObjectNotExist");
    assert_eq!(err.to_string(), "Note does not exist");
}

#[tokio::test]
async fn partial_composite_key_is_rejected() {
    let dbop = engine();
    let mut session = MockSession::new();

    let err = dbop
        .detail(&mut session, "Tag".into(), &Params::new().with("OwnerId", 1u64), None)
        .await
        .unwrap_err();

    assert_eq!(err.reason(), "IncompletePkValue");
    assert!(session.statements.is_empty());
}

#[tokio::test]
async fn keyless_model_has_no_detail() {
    let dbop = engine();
    let mut session = MockSession::new();
    let err = dbop
        .detail(&mut session, "Log".into(), &Params::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "UndefinedPk");
}

#[tokio::test]
async fn fills_the_callers_record() {
    let dbop = engine();
    let mut session = MockSession::new().rows(vec![row(json!({"owner_id": 3, "name": "red", "color": "ff0000"}))]);
    let mut record = Record::new("Tag");

    dbop.detail(
        &mut session,
        ModelRef::Record(&mut record),
        &Params::new().with("OwnerId", 3u64).with("Name", "red"),
        None,
    )
    .await
    .unwrap();

    assert_eq!(record.get("Color"), Some(&json!("ff0000")));
    assert!(session.sql()[0].ends_with(r#"WHERE "tag"."owner_id" = ? AND "tag"."name" = ? LIMIT 1 OFFSET 0"#));
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Note {
    id: u64,
    body: String,
    secret: String,
    deleted_at: i64,
}

impl Model for Note {
    fn schema() -> ModelSchema {
        ModelSchema::new("Note")
    }
}

#[tokio::test]
async fn typed_detail_takes_defaults_for_hidden_fields() {
    let dbop = engine();
    let mut session = MockSession::new().rows(vec![row(json!({"id": 4, "body": "hi", "deleted_at": 0}))]);

    let note: Note = dbop
        .detail_model(&mut session, &Params::new().with("Id", 4u64), None)
        .await
        .unwrap();

    assert_eq!(note.id, 4);
    assert_eq!(note.body, "hi");
    assert_eq!(note.secret, "");
}
