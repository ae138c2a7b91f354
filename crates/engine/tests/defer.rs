//! `@defer` delivery.

mod common;

use common::{starwars_schema, stream_payloads};
use engine::{MetaField, ObjectType, Registry, Schema};
use serde_json::json;

#[tokio::test]
async fn deferred_fragments_arrive_as_patches() {
    let schema = starwars_schema();

    let query = r#"{ hero { id ...NameFragment @defer(label: "NameFragment") } } fragment NameFragment on Character { id name }"#;

    insta::assert_json_snapshot!(
        stream_payloads(&schema, query).await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "id": "2001"
          }
        },
        "hasNext": true
      },
      {
        "data": {
          "id": "2001",
          "name": "R2-D2"
        },
        "path": [
          "hero"
        ],
        "label": "NameFragment",
        "hasNext": true
      },
      {
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn defer_on_a_non_streaming_request_does_not_defer() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        schema
            .execute(r"{ hero { id ... @defer { name } } }")
            .await,
        @r###"
    {
      "data": {
        "hero": {
          "id": "2001",
          "name": "R2-D2"
        }
      }
    }
    "###
    );
}

#[tokio::test]
async fn defer_with_if_false_is_inline() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r"{ hero { id ... @defer(if: false) { name } } }").await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "id": "2001",
            "name": "R2-D2"
          }
        },
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn nested_defers_with_labels() {
    let schema = starwars_schema();

    let query = r#"{ hero { ... @defer(label: "outer") { id ... @defer(label: "inner") { name } } } }"#;

    insta::assert_json_snapshot!(
        stream_payloads(&schema, query).await,
        @r###"
    [
      {
        "data": {
          "hero": {}
        },
        "hasNext": true
      },
      {
        "data": {
          "id": "2001"
        },
        "path": [
          "hero"
        ],
        "label": "outer",
        "hasNext": true
      },
      {
        "data": {
          "name": "R2-D2"
        },
        "path": [
          "hero"
        ],
        "label": "inner",
        "hasNext": true
      },
      {
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn defer_at_the_root() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r"{ hero { id } ... @defer { hero { name } } }").await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "id": "2001"
          }
        },
        "hasNext": true
      },
      {
        "data": {
          "hero": {
            "name": "R2-D2"
          }
        },
        "path": [],
        "hasNext": true
      },
      {
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn deferred_payloads_carry_their_own_errors() {
    let mut registry = Registry::new("Query");
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("soft", "Nest")
            .with_resolver(engine::Resolver::constant(json!({ "deep": null })))],
    ));
    registry.insert_type(ObjectType::new(
        "Nest",
        [MetaField::new("deep", "String!")],
    ));
    let schema = Schema::build(registry).finish().unwrap();

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r"{ soft { ... @defer { deep } } }").await,
        @r###"
    [
      {
        "data": {
          "soft": {}
        },
        "hasNext": true
      },
      {
        "data": null,
        "path": [
          "soft"
        ],
        "errors": [
          {
            "message": "An error occurred while fetching `deep`, a non-nullable value was expected but no value was found.",
            "locations": [
              {
                "line": 1,
                "column": 23
              }
            ],
            "path": [
              "soft",
              "deep"
            ]
          }
        ],
        "hasNext": true
      },
      {
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn invalid_defer_arguments_are_request_errors() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r#"{ hero { ... @defer(if: "hello") { id } } }"#).await,
        @r###"
    [
      {
        "errors": [
          {
            "message": "Invalid value for argument \"if\", expected type \"Boolean\"",
            "locations": [
              {
                "line": 1,
                "column": 25
              }
            ]
          }
        ],
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn defer_is_rejected_on_fields() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        schema.execute(r"{ hero @defer { id } }").await,
        @r###"
    {
      "errors": [
        {
          "message": "Directive \"defer\" may not be used on \"Field\"",
          "locations": [
            {
              "line": 1,
              "column": 8
            }
          ]
        }
      ]
    }
    "###
    );
}
