//! `@stream` delivery.

mod common;

use common::{starwars_registry, starwars_schema, stream_payloads};
use engine::{MetaField, ObjectType, Registry, Resolver, ResolverOutput, Schema};
use serde_json::json;

#[tokio::test]
async fn streamed_lists_deliver_their_tail_as_patches() {
    let schema = starwars_schema();

    let query =
        r#"{ hero { friends @stream(initialCount: 2, label: "HeroFriends") { name } } }"#;

    insta::assert_json_snapshot!(
        stream_payloads(&schema, query).await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "friends": [
              {
                "name": "Luke Skywalker"
              },
              {
                "name": "Han Solo"
              }
            ]
          }
        },
        "hasNext": true
      },
      {
        "data": {
          "name": "Leia Organa"
        },
        "path": [
          "hero",
          "friends",
          2
        ],
        "label": "HeroFriends",
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
async fn initial_count_covering_the_whole_list_streams_nothing() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        stream_payloads(
            &schema,
            r"{ hero { friends @stream(initialCount: 5) { name } } }"
        )
        .await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "friends": [
              {
                "name": "Luke Skywalker"
              },
              {
                "name": "Han Solo"
              },
              {
                "name": "Leia Organa"
              }
            ]
          }
        },
        "hasNext": false
      }
    ]
    "###
    );
}

#[tokio::test]
async fn stream_on_a_non_streaming_request_stays_inline() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        schema
            .execute(r"{ hero { friends @stream(initialCount: 1) { name } } }")
            .await,
        @r###"
    {
      "data": {
        "hero": {
          "friends": [
            {
              "name": "Luke Skywalker"
            },
            {
              "name": "Han Solo"
            },
            {
              "name": "Leia Organa"
            }
          ]
        }
      }
    }
    "###
    );
}

#[tokio::test]
async fn stream_with_if_false_is_inline() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        stream_payloads(
            &schema,
            r"{ hero { friends @stream(if: false, initialCount: 1) { name } } }"
        )
        .await,
        @r###"
    [
      {
        "data": {
          "hero": {
            "friends": [
              {
                "name": "Luke Skywalker"
              },
              {
                "name": "Han Solo"
              },
              {
                "name": "Leia Organa"
              }
            ]
          }
        },
        "hasNext": false
      }
    ]
    "###
    );
}

fn counting_schema(items: Vec<Result<serde_json::Value, engine::Error>>) -> Schema {
    let mut registry = Registry::new("Query");
    registry.enable_stream_directive();
    let items = std::sync::Arc::new(std::sync::Mutex::new(Some(items)));
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("numbers", "[Int]").with_resolver(Resolver::from_fn(move |_ctx| {
            let items = items.lock().unwrap().take().expect("the resolver runs once");
            Box::pin(async move {
                Ok(ResolverOutput::stream(futures_util::stream::iter(items)))
            })
        }))],
    ));
    Schema::build(registry).finish().unwrap()
}

#[tokio::test]
async fn async_sequences_stream_element_by_element() {
    let schema = counting_schema(vec![Ok(json!(0)), Ok(json!(1)), Ok(json!(2))]);

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r"{ numbers @stream(initialCount: 1) }").await,
        @r###"
    [
      {
        "data": {
          "numbers": [
            0
          ]
        },
        "hasNext": true
      },
      {
        "data": 1,
        "path": [
          "numbers",
          1
        ],
        "hasNext": true
      },
      {
        "data": 2,
        "path": [
          "numbers",
          2
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
async fn a_failing_async_sequence_stops_with_an_errored_patch() {
    let schema = counting_schema(vec![
        Ok(json!(0)),
        Ok(json!(1)),
        Ok(json!(2)),
        Err(engine::Error::new("boom")),
        Ok(json!(4)),
    ]);

    insta::assert_json_snapshot!(
        stream_payloads(&schema, r"{ numbers @stream(initialCount: 2) }").await,
        @r###"
    [
      {
        "data": {
          "numbers": [
            0,
            1
          ]
        },
        "hasNext": true
      },
      {
        "data": 2,
        "path": [
          "numbers",
          2
        ],
        "hasNext": true
      },
      {
        "data": null,
        "path": [
          "numbers",
          3
        ],
        "errors": [
          {
            "message": "boom",
            "locations": [
              {
                "line": 1,
                "column": 3
              }
            ],
            "path": [
              "numbers",
              3
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
async fn conflicting_stream_directives_reject_the_request() {
    let schema = starwars_schema();

    let query = r#"{ hero { friends @stream(initialCount: 1, label: "a") { name } friends @stream(initialCount: 2, label: "b") { name } } }"#;

    insta::assert_json_snapshot!(
        schema.execute(query).await,
        @r###"
    {
      "errors": [
        {
          "message": "Fields \"friends\" conflict because they have differing stream directives. Use different aliases on the fields to fetch both if this was intentional.",
          "locations": [
            {
              "line": 1,
              "column": 10
            },
            {
              "line": 1,
              "column": 64
            }
          ]
        }
      ]
    }
    "###
    );
}

#[tokio::test]
async fn stream_must_be_enabled_on_the_schema() {
    let schema = Schema::build(starwars_registry()).finish().unwrap();

    insta::assert_json_snapshot!(
        schema
            .execute(r"{ hero { friends @stream(initialCount: 1) { name } } }")
            .await,
        @r###"
    {
      "errors": [
        {
          "message": "Unknown directive \"@stream\".",
          "locations": [
            {
              "line": 1,
              "column": 18
            }
          ]
        }
      ]
    }
    "###
    );
}

#[tokio::test]
async fn stream_is_rejected_on_non_list_fields() {
    let schema = starwars_schema();

    insta::assert_json_snapshot!(
        schema
            .execute(r"{ hero { name @stream(initialCount: 1) } }")
            .await,
        @r###"
    {
      "errors": [
        {
          "message": "Directive \"stream\" may not be used on non-list field \"name\"",
          "locations": [
            {
              "line": 1,
              "column": 10
            }
          ]
        }
      ]
    }
    "###
    );
}
