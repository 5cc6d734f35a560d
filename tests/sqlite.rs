mod common;

use common::init_tracing;
use dbop::{connect, Dbop, DbOptions, FieldType, Model, ModelRegistry, ModelSchema, Params, Session};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Article {
    id: Option<u32>,
    title: String,
    editor_note: Option<String>,
    position: Option<i64>,
    created_at: Option<i64>,
    deleted_at: Option<i64>,
}

impl Model for Article {
    fn schema() -> ModelSchema {
        ModelSchema::new("Article")
            .field("Id", FieldType::Uint32, "pk rand:uint32:1000-9999")
            .field("Title", FieldType::String, "")
            .field("EditorNote", FieldType::String, "hidden:list")
            .field("Position", FieldType::Int, "showindex:insert")
            .field("CreatedAt", FieldType::Timestamp, "createtime")
            .field("DeletedAt", FieldType::Timestamp, "")
    }
}

const DDL: &str = "CREATE TABLE article (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    editor_note TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0,
    deleted_at INTEGER
)";

async fn setup() -> (Dbop, dbop::SqlxSession) {
    init_tracing();
    let options = DbOptions {
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        show_sql: true,
        ..DbOptions::default()
    };
    let db = connect(&options).await.unwrap();
    sqlx::query(DDL).execute(db.pool()).await.unwrap();

    let mut registry = ModelRegistry::new();
    registry.register_model::<Article>().unwrap();
    (Dbop::new(registry), db.session())
}

fn titles(page: &dbop::ListPage) -> Vec<String> {
    page.items
        .iter()
        .map(|i| i["Title"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn by_position() -> Params {
    Params::new().with("_orderBy", vec!["Position".to_string()])
}

#[tokio::test]
async fn full_lifecycle() {
    let (dbop, mut session) = setup().await;

    let mut ids = Vec::new();
    for title in ["First", "Second", "Third"] {
        let mut article = Article::default();
        let params = Params::new().with("Title", title).with("EditorNote", "private");
        let keys = dbop.create_model(&mut session, &mut article, &params, None).await.unwrap().unwrap();
        let id = keys["Id"].as_u64().unwrap();
        assert!((1000..9999).contains(&id));
        assert_eq!(article.id, Some(id as u32));
        assert_eq!(article.position, Some(1));
        ids.push(id);
    }
    assert!(!session.in_transaction());

    // newest first
    let page = dbop.list(&mut session, "Article", &by_position(), None, None).await.unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(titles(&page), ["Third", "Second", "First"]);
    assert!(page.items.iter().all(|i| i.get("EditorNote").is_none()));
    let si = page.show_index.clone().unwrap();
    assert_eq!((si.pre, si.next), (json!(-1), json!(-1)));

    // send the newest to the back
    let moved = dbop.move_index(&mut session, "Article", 1, 3).await.unwrap();
    assert_eq!(moved.affected, 3);
    let page = dbop.list(&mut session, "Article", &by_position(), None, None).await.unwrap();
    assert_eq!(titles(&page), ["Second", "First", "Third"]);

    let first = Params::new().with("Id", ids[0]);
    let affected = dbop
        .update(&mut session, "Article".into(), &first.clone().with("Title", "Renamed"), None)
        .await
        .unwrap();
    assert_eq!(affected.affected, 1);

    let detail = dbop.detail(&mut session, "Article".into(), &first, None).await.unwrap();
    assert_eq!(detail.item["Title"], json!("Renamed"));
    assert_eq!(detail.item["EditorNote"], json!("private"));
    assert_eq!(detail.item["Position"], json!(2));

    let article: Article = dbop.detail_model(&mut session, &first, None).await.unwrap();
    assert_eq!(article.title, "Renamed");
    assert!(article.created_at.unwrap() > 0);

    let deleted = dbop.delete(&mut session, "Article", &first).await.unwrap();
    assert_eq!(deleted.affected, 1);
    let err = dbop.detail(&mut session, "Article".into(), &first, None).await.unwrap_err();
    assert_eq!(err.code(), "ObjectNotExist");
}

#[tokio::test]
async fn filters_and_pages_against_sqlite() {
    let (dbop, mut session) = setup().await;
    for i in 0..25 {
        let params = Params::new().with("Title", format!("post {:02}", i));
        dbop.create(&mut session, "Article".into(), &params, None).await.unwrap();
    }

    let page = dbop
        .list(&mut session, "Article", &by_position().with("_pageNumber", 3), None, None)
        .await
        .unwrap();
    assert_eq!((page.page_count, page.items.len()), (3, 5));
    assert_eq!(page.show_index.unwrap().pre, json!(20));

    let page = dbop
        .list(&mut session, "Article", &by_position().with("_pageNumber", 2), None, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 10);
    let si = page.show_index.unwrap();
    assert_eq!((si.pre, si.next), (json!(10), json!(21)));

    let beyond = dbop
        .list(&mut session, "Article", &by_position().with("_pageNumber", i64::MAX), None, None)
        .await
        .unwrap();
    assert_eq!((beyond.total_count, beyond.items.len()), (25, 0));

    let empty = dbop
        .list(&mut session, "Article", &Params::new().with("Id", Vec::<u64>::new()), None, None)
        .await
        .unwrap();
    assert_eq!(empty.total_count, 0);

    let settings: dbop::QuerySettings = [("Title".to_string(), "like:,%".to_string())].into_iter().collect();
    let page = dbop
        .list(&mut session, "Article", &Params::new().with("Title", "post 1"), Some(&settings), None)
        .await
        .unwrap();
    assert_eq!(page.total_count, 10);
}

#[tokio::test]
async fn caller_transaction_rolls_back_everything() {
    let (dbop, mut session) = setup().await;

    session.begin().await.unwrap();
    dbop.create(&mut session, "Article".into(), &Params::new().with("Title", "gone"), None)
        .await
        .unwrap();
    assert!(session.in_transaction());
    session.rollback().await.unwrap();

    let page = dbop.list(&mut session, "Article", &Params::new(), None, None).await.unwrap();
    assert_eq!(page.total_count, 0);
}
