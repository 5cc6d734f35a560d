//! Example consumer: registers a model and runs every dbop operation against a database.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Uses `DBOP_DATABASE_URL` (default: in-memory SQLite).

use dbop::{connect, Dbop, DbOptions, FieldType, Model, ModelRegistry, ModelSchema, Params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Article {
    id: Option<u32>,
    title: String,
    body: String,
    editor_note: Option<String>,
    position: Option<i64>,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

impl Model for Article {
    fn schema() -> ModelSchema {
        ModelSchema::new("Article")
            .table("article")
            .field("Id", FieldType::Uint32, "pk rand:uint32:1000-9999")
            .field("Title", FieldType::String, "")
            .field("Body", FieldType::String, "")
            .field("EditorNote", FieldType::String, "hidden:list")
            .field("Position", FieldType::Int, "showindex:insert")
            .field("CreatedAt", FieldType::Timestamp, "createtime")
            .field("UpdatedAt", FieldType::Timestamp, "updatetime")
    }
}

const DDL: &str = "CREATE TABLE IF NOT EXISTS article (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    editor_note TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0
)";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dbop=debug,example_consumer=info")),
        )
        .init();

    let mut options = DbOptions::from_env();
    if options.database_url.contains(":memory:") {
        options.max_connections = 1;
    }
    let db = connect(&options).await?;
    sqlx::query(DDL).execute(db.pool()).await?;

    let mut registry = ModelRegistry::new();
    registry.register_model::<Article>()?;
    let dbop = Dbop::new(registry);
    let mut session = db.session();

    for (title, note) in [("First", "draft"), ("Second", "ready"), ("Third", "ready")] {
        let params = Params::new().with("Title", title).with("Body", "...").with("EditorNote", note);
        let mut article = Article::default();
        let keys = dbop.create_model(&mut session, &mut article, &params, None).await?;
        tracing::info!(?keys, position = ?article.position, "created");
    }

    let page = dbop.list(&mut session, "Article", &Params::new().with("_orderBy", vec!["Position".to_string()]), None, None).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    // The newest article sits at position 1; send it to the back.
    let moved = dbop.move_index(&mut session, "Article", 1, 3).await?;
    tracing::info!(affected = moved.affected, "moved");

    let first = page.items.first().and_then(|v| v.get("Id")).and_then(|v| v.as_u64()).unwrap_or_default();
    let id_param = Params::new().with("Id", first);
    let affected = dbop
        .update(&mut session, "Article".into(), &id_param.clone().with("Title", "Renamed"), None)
        .await?;
    tracing::info!(affected = affected.affected, "updated");

    let article: Article = dbop.detail_model(&mut session, &id_param, None).await?;
    println!("{:#?}", article);

    let deleted = dbop.delete(&mut session, "Article", &id_param).await?;
    tracing::info!(affected = deleted.affected, "deleted");
    Ok(())
}
