//! Coercion of input values (field arguments, directive arguments and
//! variables) against the registry's input types.

use std::borrow::{Borrow, Cow};

use async_graphql_parser::Pos;
use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use super::{scalars, MetaInputValue, MetaType, MetaTypeName, Registry};
use crate::{Error, ServerResult};

/// Coerce a possibly absent input value against its definition.
///
/// `Ok(None)` means the value is legitimately absent (nullable, no default).
pub fn resolve_input(
    registry: &Registry,
    error_pos: Pos,
    arg_name: &str,
    meta_input_value: &MetaInputValue,
    value: Option<ConstValue>,
) -> ServerResult<Option<ConstValue>> {
    let ty = meta_input_value.ty.to_string();
    resolve_maybe_absent_input(
        ResolveContext {
            registry,
            path: PathNode::new(arg_name),
            ty: Cow::Borrowed(&ty),
            allow_list_coercion: true,
            default_value: meta_input_value.default_value.as_ref(),
        },
        value,
    )
    .map_err(|err| err.into_server_error(error_pos))
}

#[derive(Clone, Copy)]
struct PathNode<'a> {
    name: &'a str,
    previous: Option<&'a PathNode<'a>>,
}

impl<'a> PathNode<'a> {
    fn new(name: &'a str) -> PathNode<'a> {
        PathNode {
            name,
            previous: None,
        }
    }

    fn with(&'a self, name: &'a str) -> PathNode<'a> {
        PathNode {
            name,
            previous: Some(self),
        }
    }

    fn into_vec(self) -> Vec<String> {
        let mut previous = self
            .previous
            .map(|previous| previous.into_vec())
            .unwrap_or_default();
        previous.push(self.name.to_string());
        previous
    }
}

#[derive(Clone)]
struct ResolveContext<'a> {
    registry: &'a Registry,
    path: PathNode<'a>,
    /// Expected GraphQL type
    ty: Cow<'a, str>,
    /// Whether list coercion is allowed at this point, per the input coercion
    /// rule: a bare value coerces to a single-element list, but not inside a
    /// multi-element list of lists.
    allow_list_coercion: bool,
    default_value: Option<&'a ConstValue>,
}

impl<'a> ResolveContext<'a> {
    fn with_input(&'a self, path: &'a str, input: &'a MetaInputValue) -> ResolveContext<'a> {
        ResolveContext {
            registry: self.registry,
            path: self.path.with(path),
            ty: Cow::Borrowed(input.ty.as_str()),
            allow_list_coercion: true,
            default_value: input.default_value.as_ref(),
        }
    }

    fn input_error(self, expected: &str) -> Error {
        Error::new(format!(
            "{expected} for {}",
            self.path.into_vec().join(".")
        ))
    }
}

fn resolve_maybe_absent_input(
    rctx: ResolveContext<'_>,
    value: Option<ConstValue>,
) -> Result<Option<ConstValue>, Error> {
    match value.or_else(|| rctx.default_value.cloned()) {
        Some(value) => resolve_present_input(rctx, value).map(Some),
        None => matches!(
            MetaTypeName::create(rctx.ty.borrow()),
            MetaTypeName::NonNull(_)
        )
        .then_some(Err(rctx.input_error("Unexpected null value")))
        .transpose(),
    }
}

fn resolve_present_input(rctx: ResolveContext<'_>, value: ConstValue) -> Result<ConstValue, Error> {
    match MetaTypeName::create(rctx.ty.borrow()) {
        MetaTypeName::NonNull(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Err(rctx.input_error("Unexpected null value"));
            }
            resolve_present_input(
                ResolveContext {
                    ty: Cow::Borrowed(type_name),
                    ..rctx
                },
                value,
            )
        }
        MetaTypeName::List(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Ok(value);
            }
            if let ConstValue::List(list) = value {
                let rctx = ResolveContext {
                    ty: Cow::Borrowed(type_name),
                    allow_list_coercion: list.len() <= 1,
                    default_value: None,
                    ..rctx
                };
                let mut arr = Vec::new();
                for (idx, element) in list.into_iter().enumerate() {
                    let path = idx.to_string();
                    let rctx = ResolveContext {
                        path: rctx.path.with(&path),
                        ..rctx.clone()
                    };
                    arr.push(resolve_present_input(rctx, element)?);
                }
                Ok(ConstValue::List(arr))
            } else if rctx.allow_list_coercion {
                Ok(ConstValue::List(vec![resolve_present_input(
                    ResolveContext {
                        ty: Cow::Borrowed(type_name),
                        allow_list_coercion: true,
                        default_value: None,
                        ..rctx
                    },
                    value,
                )?]))
            } else {
                Err(rctx.input_error("Expected a List"))
            }
        }
        MetaTypeName::Named(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Ok(value);
            }
            match rctx.registry.lookup_type(type_name) {
                Some(MetaType::InputObject(input_object)) => {
                    if let ConstValue::Object(mut fields) = value {
                        let mut map = IndexMap::with_capacity(fields.len());
                        for meta_input_value in input_object.input_fields.values() {
                            if let Some(field_value) = resolve_maybe_absent_input(
                                rctx.with_input(&meta_input_value.name, meta_input_value),
                                fields.shift_remove(meta_input_value.name.as_str()),
                            )? {
                                map.insert(Name::new(&meta_input_value.name), field_value);
                            }
                        }
                        Ok(ConstValue::Object(map))
                    } else {
                        Err(rctx.input_error("Expected an Object"))
                    }
                }
                Some(MetaType::Enum(enum_type)) => {
                    let str_value = match &value {
                        ConstValue::Enum(name) => name.as_str(),
                        ConstValue::String(string) => string.as_str(),
                        _ => {
                            return Err(rctx.clone().input_error(&format!(
                                "Expected an enum value of type \"{type_name}\", not {value}"
                            )))
                        }
                    };
                    if enum_type.value(str_value).is_none() {
                        return Err(
                            rctx.input_error(&format!("Unknown enum value \"{str_value}\""))
                        );
                    }
                    Ok(ConstValue::Enum(Name::new(str_value)))
                }
                Some(MetaType::Scalar(_)) => {
                    let error_ctx = rctx.clone();
                    scalars::parse_scalar_input(type_name, value).map_err(move |_| {
                        error_ctx.input_error(&format!("Expected type \"{type_name}\""))
                    })
                }
                _ => Err(rctx
                    .clone()
                    .input_error(&format!("Internal Error: Unsupported input type {type_name}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InputObjectType;
    use async_graphql_value::ConstValue;
    use serde_json::json;

    fn registry() -> Registry {
        let mut registry = Registry::new("Query");
        registry.insert_type(InputObjectType::new(
            "Filter",
            [
                MetaInputValue::new("name", "String!"),
                MetaInputValue::new("limit", "Int").with_default(ConstValue::Number(10.into())),
            ],
        ));
        registry
    }

    fn coerce(ty: &str, value: Option<serde_json::Value>) -> ServerResult<Option<ConstValue>> {
        let input = MetaInputValue::new("arg", ty);
        resolve_input(
            &registry(),
            Pos::default(),
            "arg",
            &input,
            value.map(|v| ConstValue::from_json(v).unwrap()),
        )
    }

    #[test]
    fn missing_required_argument_is_an_error() {
        let err = coerce("Int!", None).unwrap_err();
        assert_eq!(err.message, "Unexpected null value for arg");
    }

    #[test]
    fn missing_nullable_argument_is_absent() {
        assert_eq!(coerce("Int", None).unwrap(), None);
    }

    #[test]
    fn single_values_coerce_to_lists() {
        assert_eq!(
            coerce("[Int]", Some(json!(3))).unwrap(),
            Some(ConstValue::from_json(json!([3])).unwrap())
        );
    }

    #[test]
    fn input_object_defaults_are_filled_in() {
        assert_eq!(
            coerce("Filter!", Some(json!({ "name": "droid" }))).unwrap(),
            Some(ConstValue::from_json(json!({ "name": "droid", "limit": 10 })).unwrap())
        );
    }

    #[test]
    fn nested_errors_carry_the_input_path() {
        let err = coerce("Filter!", Some(json!({ "name": null }))).unwrap_err();
        assert_eq!(err.message, "Unexpected null value for arg.name");
    }

    #[test]
    fn int_literals_are_range_checked() {
        assert!(coerce("Int", Some(json!(i64::from(i32::MAX) + 1)))
            .unwrap_err()
            .message
            .contains("Expected type \"Int\""));
    }
}
