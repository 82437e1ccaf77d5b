//! Integration tests for the record lifecycle: find, change tracking, create,
//! update, validation, counting and snapshots.

use crate::support::{blog, blog_with, introspector};
use lifeline::test_helpers::{row, MockExecutor};
use lifeline::{MapValue, Op, OrmError, RecordSnapshot, Row, Rule, Validation};
use sea_query::Value;
use std::sync::Arc;

fn post_row(id: i32, title: &str) -> Row {
    row([
        ("id", Value::Int(Some(id))),
        ("title", Value::from(title)),
        ("body", Value::String(None)),
        ("author_id", Value::Int(Some(2))),
        ("created_at", Value::BigInt(Some(1_700_000_000))),
        ("updated_at", Value::BigInt(None)),
    ])
}

fn plain_values(map: &indexmap::IndexMap<String, MapValue>) -> Row {
    map.iter()
        .filter_map(|(column, value)| match value {
            MapValue::Value(value) => Some((column.clone(), value.clone())),
            MapValue::Record(_) => None,
        })
        .collect()
}

#[test]
fn test_find_by_primary_key() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    let registry = blog(executor.clone());

    let post = registry.find_by_pk("post", 5).unwrap();

    assert!(post.loaded() && post.saved() && post.valid());
    assert_eq!(post.pk(), Some(&Value::Int(Some(5))));
    assert_eq!(post.value("title").unwrap(), &Value::from("Hello"));
    assert_eq!(
        executor.statements(),
        vec![r#"SELECT "posts".* FROM "posts" WHERE "posts"."id" = $1 ORDER BY "posts"."id" ASC LIMIT $2"#]
    );
}

#[test]
fn test_update_without_changes_issues_no_statement() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    post.set("title", "Hello").unwrap();
    post.update(None).unwrap();
    post.save(None).unwrap();

    assert_eq!(post.changed().count(), 0);
    assert_eq!(executor.statements().len(), 1);
}

#[test]
fn test_set_then_save_updates_changed_columns() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    executor.push_exec(lifeline::ExecResult::new(1));
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    post.set("title", "  Goodbye ").unwrap();
    assert_eq!(post.changed().collect::<Vec<_>>(), vec!["title"]);
    assert!(!post.saved());

    post.save(None).unwrap();

    assert!(post.saved());
    assert_eq!(post.changed().count(), 0);
    assert!(!matches!(post.value("updated_at").unwrap(), Value::BigInt(None)));
    let statements = executor.statements();
    assert_eq!(
        statements[1],
        r#"UPDATE "posts" SET "title" = $1, "updated_at" = $2 WHERE "id" = $3"#
    );
    let executed = executor.executed();
    assert_eq!(executed[1].values.0[0], Value::from("Goodbye"));
}

#[test]
fn test_create_then_find_round_trips() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![row([("id", Value::Int(Some(7)))])]);
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    post.set("title", "Fresh").unwrap().set("author_id", 2).unwrap();
    post.create(None).unwrap();

    assert!(post.loaded() && post.saved());
    assert_eq!(post.pk(), Some(&Value::Int(Some(7))));
    assert_eq!(
        executor.statements()[0],
        r#"INSERT INTO "posts" ("title", "author_id", "created_at") VALUES ($1, $2, $3) RETURNING "id""#
    );

    executor.push_rows(vec![plain_values(&post.as_map())]);
    let found = registry.find_by_pk("post", 7).unwrap();
    assert_eq!(found.as_map(), post.as_map());
    assert_eq!(found, post);
}

#[test]
fn test_create_on_loaded_record_fails() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    let registry = blog(executor);

    let mut post = registry.find_by_pk("post", 5).unwrap();
    assert!(matches!(post.create(None), Err(OrmError::InvalidOperation(_))));
}

#[test]
fn test_validation_failure_carries_external_errors() {
    let executor = Arc::new(MockExecutor::new());
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    let mut extra = Validation::new(Default::default())
        .object("signup")
        .rule("agree", Rule::not_empty());

    let err = post.save(Some(&mut extra)).unwrap_err();
    let errors = err.validation_errors().expect("validation error");

    assert_eq!(errors.get("title").map(|e| e.rule.as_str()), Some("not_empty"));
    let external = errors.external.as_deref().expect("external errors");
    assert!(external.get("agree").is_some());
    let messages = errors.messages();
    assert_eq!(messages.get("title").map(String::as_str), Some("Title must not be empty"));
    assert!(messages.contains_key("_external.agree"));
    assert!(!post.valid());
    assert!(executor.statements().is_empty());
}

#[test]
fn test_external_failure_alone_still_rejects_save() {
    let executor = Arc::new(MockExecutor::new());
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    post.set("title", "Valid title").unwrap();
    let mut extra = Validation::new(Default::default()).rule("agree", Rule::not_empty());

    let err = post.create(Some(&mut extra)).unwrap_err();
    assert!(matches!(err, OrmError::ValidationFailed(_)));
    assert!(post.valid());
    assert!(!post.loaded());
    assert!(executor.statements().is_empty());
}

#[test]
fn test_count_then_select_with_kept_calls() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![row([("records_found", Value::BigInt(Some(2)))])]);
    executor.push_rows(vec![post_row(1, "draft one"), post_row(2, "draft two")]);
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    post.and_where("title", Op::Like, "draft%").reset(false);

    assert_eq!(post.count_all().unwrap(), 2);
    let found: Vec<_> = post.find_all().unwrap().collect::<Result<_, _>>().unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|post| post.loaded()));
    assert_eq!(
        executor.statements(),
        vec![
            r#"SELECT COUNT(*) AS "records_found" FROM "posts" WHERE "title" LIKE $1"#,
            r#"SELECT "posts".* FROM "posts" WHERE "title" LIKE $1 ORDER BY "posts"."id" ASC"#,
        ]
    );
    assert!(post.pending_calls().is_empty());
}

#[test]
fn test_reload_is_idempotent() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    executor.push_rows(vec![post_row(5, "Hello")]);
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    let before = post.as_map();
    post.reload().unwrap();

    assert_eq!(post.as_map(), before);
    assert!(post.loaded());
    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], statements[1]);
}

#[test]
fn test_snapshot_restore_reloads_loaded_record() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, "Hello")]);
    executor.push_rows(vec![post_row(5, "Edited elsewhere")]);
    let registry = blog(executor.clone());

    let post = registry.find_by_pk("post", 5).unwrap();
    let json = serde_json::to_string(&post.snapshot()).unwrap();
    let snapshot: RecordSnapshot = serde_json::from_str(&json).unwrap();
    let restored = registry.restore(snapshot).unwrap();

    assert!(restored.loaded());
    assert_eq!(restored.value("title").unwrap(), &Value::from("Edited elsewhere"));
    assert_eq!(executor.statements().len(), 2);
}

#[test]
fn test_snapshot_restore_keeps_unsaved_changes() {
    let executor = Arc::new(MockExecutor::new());
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    post.set("title", "Draft").unwrap();
    let restored = registry.restore(post.snapshot()).unwrap();

    assert!(!restored.loaded());
    assert!(restored.is_changed("title"));
    assert_eq!(restored.value("title").unwrap(), &Value::from("Draft"));
    assert!(executor.statements().is_empty());
}

#[test]
fn test_columns_are_introspected_once_per_model() {
    let executor = Arc::new(MockExecutor::new());
    let introspector = Arc::new(introspector());
    let registry = blog_with(executor, introspector.clone());

    let first = registry.factory("post").unwrap();
    let second = registry.factory("post").unwrap();
    assert_eq!(introspector.calls(), 1);
    assert_eq!(first.table_columns(), second.table_columns());

    let mut third = registry.factory("post").unwrap();
    third.reload_columns(true).unwrap();
    assert_eq!(introspector.calls(), 2);
}
