//! Serial execution of mutation roots.

mod common;

use std::sync::{Arc, Mutex};

use common::{int_arg, stream_payloads};
use engine::{
    Error, MetaField, MetaInputValue, ObjectType, Registry, Resolver, ResolverOutput, Schema,
};
use serde_json::json;

/// A schema in the style of the classic number-changing mutation fixture:
/// every mutation records the number it was asked to set, so tests can assert
/// that side effects happened strictly in declaration order.
fn number_schema() -> (Schema, Arc<Mutex<Vec<i64>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut registry = Registry::new("Query").with_mutation_type("Mutation");
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("theNumber", "Int").with_resolver(Resolver::constant(json!(0)))],
    ));
    registry.insert_type(ObjectType::new(
        "NumberHolder",
        [MetaField::new("theNumber", "Int")],
    ));

    let immediate_log = log.clone();
    let promised_log = log.clone();
    registry.insert_type(ObjectType::new(
        "Mutation",
        [
            MetaField::new("immediatelyChangeTheNumber", "NumberHolder")
                .with_argument(MetaInputValue::new("newNumber", "Int"))
                .with_resolver(Resolver::from_fn(move |ctx| {
                    let number = int_arg(&ctx, "newNumber");
                    let log = immediate_log.clone();
                    Box::pin(async move {
                        log.lock().unwrap().push(number);
                        Ok(ResolverOutput::from(json!({ "theNumber": number })))
                    })
                })),
            MetaField::new("promiseToChangeTheNumber", "NumberHolder")
                .with_argument(MetaInputValue::new("newNumber", "Int"))
                .with_resolver(Resolver::from_fn(move |ctx| {
                    let number = int_arg(&ctx, "newNumber");
                    let log = promised_log.clone();
                    Box::pin(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                        log.lock().unwrap().push(number);
                        Ok(ResolverOutput::from(json!({ "theNumber": number })))
                    })
                })),
            MetaField::new("failToChangeTheNumber", "NumberHolder")
                .with_argument(MetaInputValue::new("newNumber", "Int"))
                .with_resolver(Resolver::from_fn(|_ctx| {
                    Box::pin(async { Err(Error::new("Cannot change the number")) })
                })),
            MetaField::new("promiseAndFailToChangeTheNumber", "NumberHolder")
                .with_argument(MetaInputValue::new("newNumber", "Int"))
                .with_resolver(Resolver::from_fn(|_ctx| {
                    Box::pin(async {
                        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                        Err(Error::new("Cannot change the number"))
                    })
                })),
        ],
    ));

    (Schema::build(registry).finish().unwrap(), log)
}

#[tokio::test]
async fn mutations_run_serially() {
    let (schema, log) = number_schema();

    let query = r"mutation {
  first: immediatelyChangeTheNumber(newNumber: 1) { theNumber }
  second: promiseToChangeTheNumber(newNumber: 2) { theNumber }
  third: immediatelyChangeTheNumber(newNumber: 3) { theNumber }
  fourth: promiseToChangeTheNumber(newNumber: 4) { theNumber }
  fifth: immediatelyChangeTheNumber(newNumber: 5) { theNumber }
}";

    insta::assert_json_snapshot!(
        schema.execute(query).await,
        @r###"
    {
      "data": {
        "first": {
          "theNumber": 1
        },
        "second": {
          "theNumber": 2
        },
        "third": {
          "theNumber": 3
        },
        "fourth": {
          "theNumber": 4
        },
        "fifth": {
          "theNumber": 5
        }
      }
    }
    "###
    );

    // Each resolver settled, promise or not, before the next one started.
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn failing_mutations_do_not_abort_the_serial_pass() {
    let (schema, log) = number_schema();

    let query = r"mutation {
  first: immediatelyChangeTheNumber(newNumber: 1) { theNumber }
  second: promiseToChangeTheNumber(newNumber: 2) { theNumber }
  third: failToChangeTheNumber(newNumber: 3) { theNumber }
  fourth: promiseToChangeTheNumber(newNumber: 4) { theNumber }
  fifth: immediatelyChangeTheNumber(newNumber: 5) { theNumber }
  sixth: promiseAndFailToChangeTheNumber(newNumber: 6) { theNumber }
}";

    insta::assert_json_snapshot!(
        schema.execute(query).await,
        @r###"
    {
      "data": {
        "first": {
          "theNumber": 1
        },
        "second": {
          "theNumber": 2
        },
        "third": null,
        "fourth": {
          "theNumber": 4
        },
        "fifth": {
          "theNumber": 5
        },
        "sixth": null
      },
      "errors": [
        {
          "message": "Cannot change the number",
          "locations": [
            {
              "line": 4,
              "column": 3
            }
          ],
          "path": [
            "third"
          ]
        },
        {
          "message": "Cannot change the number",
          "locations": [
            {
              "line": 7,
              "column": 3
            }
          ],
          "path": [
            "sixth"
          ]
        }
      ]
    }
    "###
    );

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn defer_reads_as_absent_at_the_mutation_root() {
    let (schema, log) = number_schema();

    let query = r"mutation {
  first: immediatelyChangeTheNumber(newNumber: 1) { theNumber }
  ... @defer {
    second: promiseToChangeTheNumber(newNumber: 2) { theNumber }
  }
}";

    insta::assert_json_snapshot!(
        stream_payloads(&schema, query).await,
        @r###"
    [
      {
        "data": {
          "first": {
            "theNumber": 1
          },
          "second": {
            "theNumber": 2
          }
        },
        "hasNext": false
      }
    ]
    "###
    );

    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn defer_inside_a_mutation_field_is_honored() {
    let (schema, _log) = number_schema();

    let query = r"mutation {
  first: immediatelyChangeTheNumber(newNumber: 1) { ... @defer { theNumber } }
}";

    insta::assert_json_snapshot!(
        stream_payloads(&schema, query).await,
        @r###"
    [
      {
        "data": {
          "first": {}
        },
        "hasNext": true
      },
      {
        "data": {
          "theNumber": 1
        },
        "path": [
          "first"
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
