//! Reading the executor-recognized directives off a selection.
//!
//! All argument handling goes through the registry's directive definitions so
//! defaults and type checks live in one place.

use async_graphql_parser::types::Directive;
use async_graphql_value::{ConstValue, Name, Variables};
use indexmap::IndexMap;

use crate::{
    registry::{input_resolution::resolve_input, MetaDirective, Registry},
    Positioned, ServerError, ServerResult,
};

/// A resolved `@defer` application with `if: true`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferDirective {
    pub label: Option<String>,
}

/// A resolved `@stream` application with `if: true`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDirective {
    pub label: Option<String>,
    pub initial_count: usize,
}

fn find_directive<'a>(
    directives: &'a [Positioned<Directive>],
    name: &str,
) -> Option<&'a Positioned<Directive>> {
    directives
        .iter()
        .find(|directive| directive.node.name.node == name)
}

/// Coerce the arguments of one directive application against its definition.
fn read_directive_arguments(
    registry: &Registry,
    variables: &Variables,
    directive: &Positioned<Directive>,
    definition: &MetaDirective,
) -> ServerResult<IndexMap<Name, ConstValue>> {
    let mut arguments = IndexMap::new();
    for argument in definition.args.values() {
        let provided = directive.node.get_argument(&argument.name).cloned();
        let pos = provided
            .as_ref()
            .map(|value| value.pos)
            .unwrap_or(directive.pos);
        let value = provided
            .map(|value| {
                value.node.into_const_with(|name| {
                    variables.get(name.as_str()).cloned().ok_or_else(|| {
                        ServerError::new(
                            format!("Variable {name} is not defined."),
                            Some(value.pos),
                        )
                    })
                })
            })
            .transpose()?;

        let coerced = resolve_input(registry, pos, &argument.name, argument, value)
            .map_err(|_| {
                ServerError::new(
                    format!(
                        "Invalid value for argument \"{}\", expected type \"{}\"",
                        argument.name,
                        argument.ty.named_type()
                    ),
                    Some(pos),
                )
            })?;
        if let Some(coerced) = coerced {
            arguments.insert(Name::new(&argument.name), coerced);
        }
    }
    Ok(arguments)
}

fn boolean_argument(arguments: &IndexMap<Name, ConstValue>, name: &str) -> bool {
    matches!(arguments.get(name), Some(ConstValue::Boolean(true)))
}

fn label_argument(arguments: &IndexMap<Name, ConstValue>) -> Option<String> {
    match arguments.get("label") {
        Some(ConstValue::String(label)) => Some(label.clone()),
        _ => None,
    }
}

/// Whether `@skip`/`@include` exclude this selection.
pub(crate) fn is_skipped(
    registry: &Registry,
    variables: &Variables,
    directives: &[Positioned<Directive>],
) -> ServerResult<bool> {
    if let (Some(directive), Some(definition)) =
        (find_directive(directives, "skip"), registry.directive("skip"))
    {
        let arguments = read_directive_arguments(registry, variables, directive, definition)?;
        if boolean_argument(&arguments, "if") {
            return Ok(true);
        }
    }
    if let (Some(directive), Some(definition)) = (
        find_directive(directives, "include"),
        registry.directive("include"),
    ) {
        let arguments = read_directive_arguments(registry, variables, directive, definition)?;
        if !boolean_argument(&arguments, "if") {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The `@defer` application of this selection, if it is present and enabled.
/// `@defer(if: false)` reads as absent.
pub(crate) fn defer_directive(
    registry: &Registry,
    variables: &Variables,
    directives: &[Positioned<Directive>],
) -> ServerResult<Option<DeferDirective>> {
    let Some(directive) = find_directive(directives, "defer") else {
        return Ok(None);
    };
    let Some(definition) = registry.directive("defer") else {
        return Err(ServerError::new(
            "Unknown directive \"@defer\".",
            Some(directive.pos),
        ));
    };
    let arguments = read_directive_arguments(registry, variables, directive, definition)?;
    if !boolean_argument(&arguments, "if") {
        return Ok(None);
    }
    Ok(Some(DeferDirective {
        label: label_argument(&arguments),
    }))
}

/// The `@stream` application of this selection, if it is present and enabled.
/// `@stream(if: false)` reads as absent.
pub(crate) fn stream_directive(
    registry: &Registry,
    variables: &Variables,
    directives: &[Positioned<Directive>],
) -> ServerResult<Option<StreamDirective>> {
    let Some(directive) = find_directive(directives, "stream") else {
        return Ok(None);
    };
    let Some(definition) = registry.directive("stream") else {
        return Err(ServerError::new(
            "Unknown directive \"@stream\".",
            Some(directive.pos),
        ));
    };
    let arguments = read_directive_arguments(registry, variables, directive, definition)?;
    if !boolean_argument(&arguments, "if") {
        return Ok(None);
    }
    let initial_count = match arguments.get("initialCount") {
        Some(ConstValue::Number(count)) => {
            count.as_u64().and_then(|count| usize::try_from(count).ok())
        }
        _ => Some(0),
    };
    let Some(initial_count) = initial_count else {
        return Err(ServerError::new(
            "Invalid value for argument \"initialCount\", expected a non-negative Int",
            Some(directive.pos),
        ));
    };
    Ok(Some(StreamDirective {
        label: label_argument(&arguments),
        initial_count,
    }))
}
