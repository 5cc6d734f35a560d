mod common;

use common::{article_rows, engine, row, MockSession};
use dbop::sql::BindValue;
use dbop::{Dialect, Model, ModelSchema, Params, QuerySettings, Row};
use serde_json::json;

fn settings(pairs: &[(&str, &str)]) -> QuerySettings {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn tag_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| row(json!({"owner_id": 1, "name": format!("n{}", i), "color": "red"})))
        .collect()
}

#[tokio::test]
async fn last_page_of_plain_model() {
    let dbop = engine();
    let mut session = MockSession::new().count(25).rows(tag_rows(5));

    let page = dbop
        .list(&mut session, "Tag", &Params::new().with("_pageNumber", 3), None, None)
        .await
        .unwrap();

    assert_eq!((page.total_count, page.page_count, page.page_number, page.page_size), (25, 3, 3, 10));
    assert_eq!(page.items.len(), 5);
    assert!(page.show_index.is_none());
    assert_eq!(session.sql()[0], r#"SELECT COUNT(*) FROM "tag""#);
    assert_eq!(
        session.sql()[1],
        r#"SELECT "tag"."owner_id", "tag"."name", "tag"."color" FROM "tag" LIMIT 10 OFFSET 20"#
    );

    let body = serde_json::to_value(&page).unwrap();
    assert_eq!(body["TotalCount"], json!(25));
    assert_eq!(body["TagList"].as_array().unwrap().len(), 5);
    assert!(body.get("ShowIndex").is_none());
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
    let dbop = engine();
    let mut session = MockSession::new().count(25);

    let page = dbop
        .list(&mut session, "Tag", &Params::new().with("_pageNumber", i64::MAX), None, None)
        .await
        .unwrap();

    assert_eq!((page.total_count, page.page_count, page.page_number), (25, 3, i64::MAX));
    assert!(page.items.is_empty());
    // only the count ran
    assert_eq!(session.statements.len(), 1);

    let mut session = MockSession::new().count(40);
    let params = Params::new().with("_pageSize", 1000).with("_pageNumber", u64::MAX);
    let page = dbop.list(&mut session, "Tag", &params, None, None).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(session.statements.len(), 1);
}

#[tokio::test]
async fn huge_page_with_lookahead_is_empty() {
    let dbop = engine();
    let mut session = MockSession::new().count(5000);
    let params = Params::new().with("_pageSize", 1000).with("_pageNumber", i64::MAX / 5);

    let page = dbop.list(&mut session, "Article", &params, None, None).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.page_count, 5);
    let si = page.show_index.unwrap();
    assert_eq!((si.pre, si.next), (json!(-1), json!(-1)));
    assert_eq!(session.statements.len(), 1);
}

#[tokio::test]
async fn oversized_page_falls_back_to_default() {
    let dbop = engine();
    let mut session = MockSession::new().count(3).rows(tag_rows(3));

    let page = dbop
        .list(&mut session, "Tag", &Params::new().with("_pageSize", 2000), None, None)
        .await
        .unwrap();

    assert_eq!(page.page_size, 10);
    assert!(session.sql()[1].ends_with("LIMIT 10 OFFSET 0"));
}

#[tokio::test]
async fn empty_set_matches_nothing() {
    let dbop = engine();
    let mut session = MockSession::new().count(0);

    let page = dbop
        .list(&mut session, "Article", &Params::new().with("Id", Vec::<u64>::new()), None, None)
        .await
        .unwrap();

    assert_eq!(page.total_count, 0);
    assert!(page.items.is_empty());
    assert_eq!(session.sql(), vec![r#"SELECT COUNT(*) FROM "article" WHERE 1=0"#]);
    let si = page.show_index.expect("Article has a display index");
    assert_eq!((si.pre, si.next), (json!(-1), json!(-1)));
}

#[tokio::test]
async fn middle_page_reports_both_neighbors() {
    let dbop = engine();
    let mut session = MockSession::new().count(25).rows(article_rows(10, 12));

    let page = dbop
        .list(&mut session, "Article", &Params::new().with("_pageNumber", 2), None, None)
        .await
        .unwrap();

    assert!(session.sql()[1].ends_with("LIMIT 12 OFFSET 9"));
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0]["Position"], json!(11));
    assert_eq!(page.items[9]["Position"], json!(20));
    let si = page.show_index.unwrap();
    assert_eq!((si.pre, si.next), (json!(10), json!(21)));
}

#[tokio::test]
async fn first_page_has_no_predecessor() {
    let dbop = engine();
    let mut session = MockSession::new().count(25).rows(article_rows(1, 11));

    let page = dbop.list(&mut session, "Article", &Params::new(), None, None).await.unwrap();

    assert!(session.sql()[1].ends_with("LIMIT 11 OFFSET 0"));
    assert_eq!(page.items.len(), 10);
    let si = page.show_index.unwrap();
    assert_eq!((si.pre, si.next), (json!(-1), json!(11)));
}

#[tokio::test]
async fn short_fetch_keeps_the_last_row() {
    // Rows vanished between count and find: nothing beyond the page to strip.
    let dbop = engine();
    let mut session = MockSession::new().count(25).rows(article_rows(1, 7));

    let page = dbop.list(&mut session, "Article", &Params::new(), None, None).await.unwrap();

    assert_eq!(page.items.len(), 7);
    assert_eq!(page.show_index.unwrap().next, json!(-1));
}

#[tokio::test]
async fn list_hidden_fields_are_neither_selected_nor_returned() {
    let dbop = engine();
    let mut session = MockSession::new()
        .count(1)
        .rows(vec![row(json!({"id": 150, "title": "a", "position": 1, "editor_note": "leak"}))]);

    let page = dbop.list(&mut session, "Article", &Params::new(), None, None).await.unwrap();

    assert!(!session.sql()[1].contains("editor_note"));
    assert!(page.items[0].get("EditorNote").is_none());
    assert_eq!(page.items[0]["Title"], json!("a"));
}

#[tokio::test]
async fn filters_orders_and_likes() {
    let dbop = engine();
    let mut session = MockSession::new().count(1).rows(tag_rows(1));
    let params = Params::new()
        .with("OwnerId", 7u64)
        .with("Name", "re")
        .with("_orderBy", vec!["Name".to_string(), "Color".to_string()])
        .with("_order", vec!["desc".to_string()]);

    dbop.list(&mut session, "Tag", &params, Some(&settings(&[("Name", "like:%,%")])), None)
        .await
        .unwrap();

    let count = &session.statements[0];
    assert_eq!(count.sql, r#"SELECT COUNT(*) FROM "tag" WHERE "owner_id" = ? AND "name" LIKE ?"#);
    assert_eq!(count.params, vec![BindValue::U64(7), BindValue::String("%re%".into())]);
    assert!(session.sql()[1].contains(r#"ORDER BY "name" DESC, "color" ASC"#));
}

#[tokio::test]
async fn or_directive_spreads_one_value_across_fields() {
    let dbop = engine();
    let mut session = MockSession::new().count(0);
    let params = Params::new().with("Keyword", "red").with("OwnerId", 1u64);

    dbop.list(&mut session, "Tag", &params, Some(&settings(&[("Keyword", "or:Name,Color")])), None)
        .await
        .unwrap();

    let count = &session.statements[0];
    assert_eq!(
        count.sql,
        r#"SELECT COUNT(*) FROM "tag" WHERE ("name" = ? OR "color" = ?) AND "owner_id" = ?"#
    );
    assert_eq!(
        count.params,
        vec![BindValue::String("red".into()), BindValue::String("red".into()), BindValue::U64(1)]
    );
    assert!(!params.has("Name"));
}

#[tokio::test]
async fn joins_and_table_directives() {
    let dbop = engine();
    let mut session = MockSession::with_dialect(Dialect::MySql).count(0);
    let joins = vec![vec!["LEFT".to_string(), "owner AS o".to_string(), "o.id = t.owner_id".to_string()]];

    dbop.list(
        &mut session,
        "Tag",
        &Params::new().with("Name", "x"),
        Some(&settings(&[(":table:", "table:tag_archive"), ("Name", "table:t")])),
        Some(joins.as_slice()),
    )
    .await
    .unwrap();

    assert_eq!(
        session.sql()[0],
        "SELECT COUNT(*) FROM `tag_archive` LEFT JOIN `owner` AS `o` ON o.id = t.owner_id WHERE `t`.`name` = ?"
    );
}

#[tokio::test]
async fn malformed_join_is_rejected_before_any_query() {
    let dbop = engine();
    let mut session = MockSession::new();
    let joins = vec![vec!["LEFT".to_string(), "owner".to_string()]];

    let err = dbop
        .list(&mut session, "Tag", &Params::new(), None, Some(joins.as_slice()))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "WrongJoinCond");
    assert!(session.statements.is_empty());
}

#[tokio::test]
async fn postgres_placeholders_are_numbered() {
    let dbop = engine();
    let mut session = MockSession::with_dialect(Dialect::Postgres).count(0);

    dbop.list(&mut session, "Tag", &Params::new().with("OwnerId", vec![1u64, 2]).with("Color", "red"), None, None)
        .await
        .unwrap();

    assert_eq!(
        session.sql()[0],
        r#"SELECT COUNT(*) FROM "tag" WHERE "owner_id" IN ($1, $2) AND "color" = $3"#
    );
}

#[tokio::test]
async fn typed_list() {
    #[derive(serde::Serialize, serde::Deserialize, Default)]
    #[serde(rename_all = "PascalCase", default)]
    struct Tag {
        owner_id: u64,
        name: String,
        color: String,
    }
    impl Model for Tag {
        fn schema() -> ModelSchema {
            ModelSchema::new("Tag")
        }
    }

    let dbop = engine();
    let mut session = MockSession::new().count(2).rows(tag_rows(2));
    let page = dbop.list_models::<Tag>(&mut session, &Params::new(), None, None).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[1].name, "n1");
    assert_eq!(page.items[0].owner_id, 1);
}
