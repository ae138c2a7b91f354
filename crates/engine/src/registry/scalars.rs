//! Coercion of built-in scalar values.
//!
//! The five spec scalars are validated strictly on both the input and the
//! output side; custom scalars pass through untouched.

use async_graphql_value::ConstValue;
use serde_json::Value;

use crate::Error;

/// Validate an input literal (or variable value) against a scalar type.
pub(crate) fn parse_scalar_input(type_name: &str, value: ConstValue) -> Result<ConstValue, Error> {
    let ok = match type_name {
        "Int" => matches!(&value, ConstValue::Number(n) if n.as_i64().is_some_and(|n| i32::try_from(n).is_ok())),
        "Float" => matches!(&value, ConstValue::Number(n) if n.as_f64().is_some()),
        "String" => matches!(value, ConstValue::String(_)),
        "Boolean" => matches!(value, ConstValue::Boolean(_)),
        "ID" => matches!(&value, ConstValue::String(_))
            || matches!(&value, ConstValue::Number(n) if n.as_i64().is_some()),
        // A custom scalar accepts any literal.
        _ => true,
    };
    if ok {
        Ok(value)
    } else {
        Err(Error::new(format!(
            "Invalid value for argument of type \"{type_name}\""
        )))
    }
}

/// Serialize a resolver-produced JSON value as a scalar of the given type.
pub(crate) fn serialize_scalar(type_name: &str, value: Value) -> Result<ConstValue, Error> {
    match type_name {
        "Int" => {
            // Result coercion does not round: a non-integer here is a bug in
            // the resolver, not something to paper over.
            let int = value
                .as_i64()
                .ok_or_else(|| Error::new(format!("Resolver returned {value}, expected an Int")))?;
            if i32::try_from(int).is_err() {
                return Err(Error::new(format!(
                    "Resolver returned {int} which overflows Int"
                )));
            }
            Ok(ConstValue::from_json(Value::from(int))?)
        }
        "Float" => {
            if !value.is_number() {
                return Err(Error::new(format!(
                    "Resolver returned {value}, expected a Float"
                )));
            }
            Ok(ConstValue::from_json(value)?)
        }
        "String" => match value {
            Value::String(s) => Ok(ConstValue::String(s)),
            other => Err(Error::new(format!(
                "Resolver returned {other}, expected a String"
            ))),
        },
        "Boolean" => match value {
            Value::Bool(b) => Ok(ConstValue::Boolean(b)),
            other => Err(Error::new(format!(
                "Resolver returned {other}, expected a Boolean"
            ))),
        },
        "ID" => match value {
            Value::String(s) => Ok(ConstValue::String(s)),
            Value::Number(n) if n.as_i64().is_some() => Ok(ConstValue::String(n.to_string())),
            other => Err(Error::new(format!(
                "Resolver returned {other}, expected an ID"
            ))),
        },
        // Custom scalars accept any JSON value, including lists and objects.
        _ => Ok(ConstValue::from_json(value)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_overflow_is_rejected() {
        assert!(serialize_scalar("Int", json!(1)).is_ok());
        assert!(serialize_scalar("Int", json!(i64::from(i32::MAX) + 1)).is_err());
        assert!(serialize_scalar("Int", json!(1.5)).is_err());
    }

    #[test]
    fn id_accepts_strings_and_integers() {
        assert_eq!(
            serialize_scalar("ID", json!(2001)).unwrap(),
            ConstValue::String("2001".to_string())
        );
        assert_eq!(
            serialize_scalar("ID", json!("2001")).unwrap(),
            ConstValue::String("2001".to_string())
        );
        assert!(serialize_scalar("ID", json!(true)).is_err());
    }

    #[test]
    fn custom_scalars_pass_through() {
        let value = json!({ "lat": 1.0, "lon": 2.0 });
        assert_eq!(
            serialize_scalar("Coordinates", value.clone()).unwrap(),
            ConstValue::from_json(value).unwrap()
        );
    }
}
