#![allow(dead_code)]

use engine::{
    ConstValue, MetaField, ObjectType, Registry, Request, Resolver, ResolverContext, Schema,
    StreamingPayload,
};
use futures_util::StreamExt;
use serde_json::json;

pub fn hero_json() -> serde_json::Value {
    json!({
        "id": 2001,
        "name": "R2-D2",
        "friends": [
            { "id": 1000, "name": "Luke Skywalker" },
            { "id": 1002, "name": "Han Solo" },
            { "id": 1003, "name": "Leia Organa" },
        ],
    })
}

pub fn starwars_registry() -> Registry {
    let mut registry = Registry::new("Query");
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("hero", "Character").with_resolver(Resolver::constant(hero_json()))],
    ));
    registry.insert_type(ObjectType::new(
        "Character",
        [
            MetaField::new("id", "ID!"),
            MetaField::new("name", "String"),
            MetaField::new("friends", "[Character]"),
        ],
    ));
    registry
}

pub fn starwars_schema() -> Schema {
    let mut registry = starwars_registry();
    registry.enable_stream_directive();
    Schema::build(registry).finish().unwrap()
}

/// Drain a streaming execution into the full payload sequence.
pub async fn stream_payloads(
    schema: &Schema,
    request: impl Into<Request>,
) -> Vec<StreamingPayload> {
    schema.execute_stream(request).collect().await
}

/// Read an integer argument in a test resolver.
pub fn int_arg(ctx: &ResolverContext<'_>, name: &str) -> i64 {
    match ctx.argument(name) {
        Some(ConstValue::Number(number)) => number.as_i64().unwrap(),
        other => panic!("expected an integer argument {name}, got {other:?}"),
    }
}
