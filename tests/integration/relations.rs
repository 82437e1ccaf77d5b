//! Integration tests for relations: lazy one-to-one resolution, eager `with()`
//! paths, to-many queries and join table maintenance.

use crate::support::blog;
use lifeline::test_helpers::{row, MockExecutor};
use lifeline::{ExecResult, Field, Row};
use sea_query::Value;
use std::sync::Arc;

fn post_row(id: i32, author_id: i32) -> Row {
    row([
        ("id", Value::Int(Some(id))),
        ("title", Value::from("Hello")),
        ("body", Value::String(None)),
        ("author_id", Value::Int(Some(author_id))),
        ("created_at", Value::BigInt(None)),
        ("updated_at", Value::BigInt(None)),
    ])
}

#[test]
fn test_lazy_author_is_cached() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, 2)]);
    executor.push_rows(vec![row([
        ("id", Value::Int(Some(2))),
        ("name", Value::from("Ada")),
        ("country_id", Value::Int(None)),
    ])]);
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    match post.get("author").unwrap() {
        Field::One(author) => assert_eq!(author.value("name").unwrap(), &Value::from("Ada")),
        other => panic!("expected a related record, got {:?}", other),
    }
    assert!(matches!(post.get("author").unwrap(), Field::One(author) if author.loaded()));

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1],
        r#"SELECT "users".* FROM "users" WHERE "users"."id" = $1 LIMIT $2"#
    );

    // null foreign key on the author: resolved as absent, no query
    let author = post.resolve_one("author").unwrap();
    assert!(!author.resolve_one("country").unwrap().loaded());
    assert_eq!(executor.statements().len(), 2);
}

#[test]
fn test_with_loads_nested_path_in_one_select() {
    let executor = Arc::new(MockExecutor::new());
    let mut joined = post_row(5, 2);
    joined.extend(row([
        ("author:id", Value::Int(Some(2))),
        ("author:name", Value::from("Ada")),
        ("author:country_id", Value::Int(Some(44))),
        ("author:country:id", Value::Int(Some(44))),
        ("author:country:name", Value::from("United Kingdom")),
    ]));
    executor.push_rows(vec![joined]);
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    post.with("author:country")
        .unwrap()
        .and_where("posts.id", lifeline::Op::Eq, 5)
        .find()
        .unwrap();

    let statements = executor.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains(r#"LEFT JOIN "users" AS "author""#));
    assert!(statements[0].contains(r#"LEFT JOIN "countries" AS "author:country""#));
    assert!(statements[0].contains(r#""author:country"."name" AS "author:country:name""#));

    let author = post.resolve_one("author").unwrap();
    assert!(author.loaded());
    let country = author.resolve_one("country").unwrap();
    assert_eq!(country.value("name").unwrap(), &Value::from("United Kingdom"));
    assert_eq!(executor.statements().len(), 1);

    assert_eq!(post.to_json()["author"]["country"]["id"], serde_json::json!(44));
}

#[test]
fn test_has_many_through_is_a_scoped_query() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, 2)]);
    executor.push_rows(vec![
        row([("id", Value::Int(Some(1))), ("name", Value::from("rust"))]),
        row([("id", Value::Int(Some(3))), ("name", Value::from("orm"))]),
    ]);
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    let Field::Many(mut tags) = post.get("tags").unwrap() else {
        panic!("tags should be a to-many relation");
    };
    assert_eq!(executor.statements().len(), 1);

    let names: Vec<Value> = tags
        .find_all()
        .unwrap()
        .map(|tag| tag.unwrap().value("name").unwrap().clone())
        .collect();
    assert_eq!(names, vec![Value::from("rust"), Value::from("orm")]);

    let sql = &executor.statements()[1];
    assert!(sql.starts_with(r#"SELECT "tags".* FROM "tags" INNER JOIN "posts_tags""#));
    assert!(sql.contains(r#""posts_tags"."tag_id" = "tags"."id""#));
    assert!(sql.contains(r#"WHERE "posts_tags"."post_id" = $1"#));
}

#[test]
fn test_add_links_every_key_in_one_statement() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, 2)]);
    executor.push_exec(ExecResult::new(3));
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    post.add("tags", [1, 2, 3]).unwrap();

    let executed = executor.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(
        executed[1].sql,
        r#"INSERT INTO "posts_tags" ("post_id", "tag_id") VALUES ($1, $2), ($3, $4), ($5, $6)"#
    );
    assert_eq!(executed[1].values.0.len(), 6);
}

#[test]
fn test_has_returns_early_for_unloaded_record() {
    let executor = Arc::new(MockExecutor::new());
    let registry = blog(executor.clone());

    let mut post = registry.factory("post").unwrap();
    assert!(!post.has("tags", [1, 2]).unwrap());
    post.add("tags", [1]).unwrap();
    post.remove("tags", Some([1])).unwrap();
    assert!(executor.statements().is_empty());
}

#[test]
fn test_has_and_remove_on_loaded_record() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, 2)]);
    executor.push_rows(vec![row([("records_found", Value::BigInt(Some(1)))])]);
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    assert!(!post.has("tags", [1, 2]).unwrap());

    post.remove("tags", Some([1, 2])).unwrap();
    assert_eq!(
        executor.statements()[2],
        r#"DELETE FROM "posts_tags" WHERE "post_id" = $1 AND "tag_id" IN ($2, $3)"#
    );
}

#[test]
fn test_set_related_then_save_writes_foreign_key() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![post_row(5, 2)]);
    executor.push_rows(vec![row([
        ("id", Value::Int(Some(9))),
        ("name", Value::from("Grace")),
        ("country_id", Value::Int(None)),
    ])]);
    executor.push_exec(ExecResult::new(1));
    let registry = blog(executor.clone());

    let mut post = registry.find_by_pk("post", 5).unwrap();
    let grace = registry.find_by_pk("user", 9).unwrap();
    post.set_related("author", grace).unwrap();
    assert!(post.is_changed("author_id"));

    post.save(None).unwrap();
    let executed = executor.executed();
    assert!(executed[2].sql.starts_with(r#"UPDATE "posts" SET "author_id" = $1"#));
    assert_eq!(executed[2].values.0[0], Value::Int(Some(9)));
    assert!(matches!(post.get("author").unwrap(), Field::One(author) if author.pk() == Some(&Value::Int(Some(9)))));
}

#[test]
fn test_has_many_from_the_owner_side() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_rows(vec![row([
        ("id", Value::Int(Some(2))),
        ("name", Value::from("Ada")),
        ("country_id", Value::Int(None)),
    ])]);
    executor.push_rows(vec![row([("records_found", Value::BigInt(Some(4)))])]);
    let registry = blog(executor.clone());

    let user = registry.find_by_pk("user", 2).unwrap();
    let mut posts = user.related_query("posts").unwrap();
    assert_eq!(posts.count_all().unwrap(), 4);
    assert_eq!(
        executor.statements()[1],
        r#"SELECT COUNT(*) AS "records_found" FROM "posts" WHERE "posts"."author_id" = $1"#
    );
}
