//! Shared blog schema: posts written by users from countries, tagged through
//! `posts_tags`.

use lifeline::test_helpers::{MockExecutor, StaticIntrospector};
use lifeline::{
    ColumnDefinition, ColumnMap, Direction, Filter, ModelDecl, ModelRegistry, RelationOptions, Rule,
    TimestampFormat,
};
use std::sync::Arc;

fn columns(pairs: &[(&str, &str)]) -> ColumnMap {
    pairs.iter()
        .map(|(name, column_type)| (name.to_string(), ColumnDefinition::of_type(*column_type)))
        .collect()
}

pub fn introspector() -> StaticIntrospector {
    StaticIntrospector::new()
        .table(
            "posts",
            columns(&[
                ("id", "integer"),
                ("title", "varchar(255)"),
                ("body", "text"),
                ("author_id", "integer"),
                ("created_at", "bigint"),
                ("updated_at", "bigint"),
            ]),
        )
        .table("users", columns(&[("id", "integer"), ("name", "text"), ("country_id", "integer")]))
        .table("countries", columns(&[("id", "integer"), ("name", "text")]))
        .table("tags", columns(&[("id", "integer"), ("name", "text")]))
}

pub fn blog(executor: Arc<MockExecutor>) -> Arc<ModelRegistry> {
    blog_with(executor, Arc::new(introspector()))
}

pub fn blog_with(executor: Arc<MockExecutor>, introspector: Arc<StaticIntrospector>) -> Arc<ModelRegistry> {
    ModelRegistry::builder(executor)
        .introspector(introspector)
        .model(
            ModelDecl::new("post")
                .belongs_to("author", RelationOptions::new().model("user"))
                .has_many("tags", RelationOptions::new().through("posts_tags"))
                .sorting("id", Direction::Asc)
                .created_column("created_at", TimestampFormat::Unix)
                .updated_column("updated_at", TimestampFormat::Unix)
                .rule("title", Rule::not_empty())
                .rule("title", Rule::max_length(255))
                .label("title", "Title")
                .filter("title", Filter::trim()),
        )
        .model(
            ModelDecl::new("user")
                .belongs_to("country", RelationOptions::new())
                .has_many("posts", RelationOptions::new().foreign_key("author_id")),
        )
        .model(ModelDecl::new("country"))
        .model(ModelDecl::new("tag"))
        .build()
        .expect("blog models should normalize")
}
