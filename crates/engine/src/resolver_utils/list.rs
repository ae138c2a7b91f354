use async_graphql_parser::types::Field;
use async_graphql_value::ConstValue;
use futures_util::{future::join_all, stream::BoxStream, StreamExt};
use serde_json::Value;

use super::field::{complete_value, error_at, locate_error};
use crate::{
    context::{ContextExt, ContextField},
    deferred::DeferredWorkload,
    directives::StreamDirective,
    query_path::{concat_path, QueryPathNode, QueryPathSegmentRef},
    registry::{resolved_value::ResolvedValue, MetaTypeName},
    Positioned, Result, ServerError, ServerResult,
};

/// Complete a list value, resolving each of the items concurrently.
pub(super) async fn complete_list(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    item_ty: &str,
    value: ResolvedValue,
) -> ServerResult<ConstValue> {
    let Some(items) = value.item_iter() else {
        return Err(error_at(
            ctx,
            path,
            format!(
                "Encountered a {} where we expected a list",
                json_kind_str(value.data_resolved())
            ),
        ));
    };
    let items: Vec<_> = items.collect();
    complete_items(ctx, path, item_ty, 0, items)
        .await
        .map(ConstValue::List)
}

async fn complete_items(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    item_ty: &str,
    start_index: usize,
    items: Vec<ResolvedValue>,
) -> ServerResult<Vec<ConstValue>> {
    let futures = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| complete_one_item(ctx, path, item_ty, start_index + index, item));
    join_all(futures).await.into_iter().collect()
}

/// Complete a single list item, applying the list-element error rule: an
/// error at a nullable item nulls just that item, an error at a non-null item
/// propagates to the list itself.
async fn complete_one_item(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    item_ty: &str,
    index: usize,
    item: ResolvedValue,
) -> ServerResult<ConstValue> {
    let index_node = QueryPathNode::new(path, QueryPathSegmentRef::Index(index));
    match complete_value(ctx, Some(&index_node), item_ty, item).await {
        Ok(value) => Ok(value),
        Err(error) if !MetaTypeName::create(item_ty).is_non_null() => {
            ctx.add_error(error);
            Ok(ConstValue::Null)
        }
        Err(error) => Err(error),
    }
}

/// A list field whose resolver returned a plain array while carrying
/// `@stream`: the first `initialCount` items complete inline, every item
/// after that is registered as its own patch.
pub(super) async fn resolve_streamed_list(
    ctx: &ContextField<'_>,
    directive: &StreamDirective,
    value: ResolvedValue,
) -> ServerResult<ConstValue> {
    let (Some(sender), Some(item_ty)) = (ctx.deferred_workloads, ctx.field.ty.list_item_type())
    else {
        return complete_value(ctx, ctx.path, ctx.field.ty.as_str(), value).await;
    };
    if value.is_null() {
        return complete_value(ctx, ctx.path, ctx.field.ty.as_str(), value).await;
    }
    let Some(items) = value.item_iter() else {
        return Err(error_at(
            ctx,
            ctx.path,
            format!(
                "Encountered a {} where we expected a list",
                json_kind_str(value.data_resolved())
            ),
        ));
    };
    let items: Vec<_> = items.collect();

    let inline_count = directive.initial_count.min(items.len());
    let field_path = concat_path(ctx.base_path, ctx.path);
    for (offset, item) in items[inline_count..].iter().enumerate() {
        sender
            .send(DeferredWorkload::list_item(
                directive.label.clone(),
                field_path.clone(),
                ctx.parent_type.name().to_string(),
                owned_field_selections(ctx),
                item_ty.clone(),
                inline_count + offset,
                item.clone(),
            ))
            .map_err(|error| ServerError::new(error.message, None))?;
    }

    let items = items.into_iter().take(inline_count).collect();
    complete_items(ctx, ctx.path, item_ty.as_str(), 0, items)
        .await
        .map(ConstValue::List)
}

/// A list field whose resolver returned an async sequence.
///
/// With `@stream`, the first `initialCount` elements are awaited and
/// completed inline and the live tail is handed to the dispatcher. Without
/// it, the sequence is exhausted and returned like an ordinary list.
pub(super) async fn resolve_stream_field(
    ctx: &ContextField<'_>,
    mut stream: BoxStream<'static, Result<Value>>,
) -> ServerResult<ConstValue> {
    let Some(item_ty) = ctx.field.ty.list_item_type() else {
        return Err(error_at(
            ctx,
            ctx.path,
            format!(
                "The resolver of `{}` returned an async stream, but the field is not a list",
                ctx.item.node.name.node
            ),
        ));
    };

    let inline_count = match (ctx.stream, ctx.deferred_workloads) {
        (Some(directive), Some(_)) => Some(directive.initial_count),
        // Without incremental delivery the whole sequence is drained inline.
        _ => None,
    };

    let mut completed = Vec::new();
    let mut index = 0;
    let mut exhausted = false;
    while inline_count.map_or(true, |count| index < count) {
        match stream.next().await {
            None => {
                exhausted = true;
                break;
            }
            Some(Ok(value)) => {
                completed.push(
                    complete_one_item(ctx, ctx.path, item_ty.as_str(), index, value.into()).await?,
                );
                index += 1;
            }
            Some(Err(error)) => {
                // A failing source is not polled again; the element follows
                // the normal list-element error rule.
                let index_node = QueryPathNode::new(ctx.path, QueryPathSegmentRef::Index(index));
                let located = locate_error(ctx, Some(&index_node), error);
                if MetaTypeName::create(item_ty.as_str()).is_non_null() {
                    return Err(located);
                }
                ctx.add_error(located);
                completed.push(ConstValue::Null);
                exhausted = true;
                break;
            }
        }
    }

    if !exhausted {
        if let (Some(directive), Some(sender)) = (ctx.stream, ctx.deferred_workloads) {
            sender
                .send(DeferredWorkload::stream_tail(
                    directive.label.clone(),
                    concat_path(ctx.base_path, ctx.path),
                    ctx.parent_type.name().to_string(),
                    owned_field_selections(ctx),
                    item_ty,
                    index,
                    stream,
                ))
                .map_err(|error| ServerError::new(error.message, None))?;
        }
    }

    Ok(ConstValue::List(completed))
}

fn owned_field_selections(ctx: &ContextField<'_>) -> Vec<Positioned<Field>> {
    ctx.field_selections
        .iter()
        .map(|field| (*field).clone())
        .collect()
}

fn json_kind_str(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
