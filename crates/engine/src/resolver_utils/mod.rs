//! Field execution: walking grouped selections, driving resolvers and
//! completing their values against the schema.

pub(crate) mod collect;
mod field;
mod list;

use async_graphql_value::{ConstValue, Name};
use futures_util::future::join_all;
use indexmap::IndexMap;

use self::collect::{CollectMode, FieldGroup};
use crate::{
    context::{ContextField, ContextSelectionSet},
    deferred::DeferredWorkload,
    query_path::{concat_path, QueryPathNode, QueryPathSegmentRef},
    registry::resolved_value::ResolvedValue,
    ServerError, ServerResult,
};

pub(crate) use field::complete_value;

/// Resolve the selections of one object, running sibling fields concurrently.
pub(crate) async fn resolve_container(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, parent_value, true, CollectMode::Parallel).await
}

/// Resolve the mutation root: every field settles completely before the next
/// one starts, and `@defer`/`@stream` read as absent at this level.
pub(crate) async fn resolve_container_serial(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, parent_value, false, CollectMode::Serial).await
}

async fn resolve_container_inner(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
    parallel: bool,
    mode: CollectMode,
) -> ServerResult<ConstValue> {
    let collected = collect::collect_fields(ctx, mode)?;

    if let Some(sender) = ctx.deferred_workloads {
        for deferred in &collected.deferred {
            sender
                .send(DeferredWorkload::fragment(
                    deferred.label.clone(),
                    concat_path(ctx.base_path, ctx.path),
                    ctx.ty.name().to_string(),
                    parent_value.clone(),
                    deferred.selection_set.clone(),
                ))
                .map_err(|error| ServerError::new(error.message, None))?;
        }
    }

    let futures = collected
        .groups
        .iter()
        .map(|(response_key, group)| resolve_group(ctx, response_key, group, parent_value));

    let mut object = IndexMap::with_capacity(collected.groups.len());
    if parallel {
        for result in join_all(futures).await {
            let (name, value) = result?;
            object.insert(name, value);
        }
    } else {
        // A propagating (non-null) failure aborts the serial pass; errors
        // absorbed at nullable fields have already been recorded and the
        // loop keeps going.
        for future in futures {
            let (name, value) = future.await?;
            object.insert(name, value);
        }
    }
    Ok(ConstValue::Object(object))
}

async fn resolve_group(
    ctx: &ContextSelectionSet<'_>,
    response_key: &str,
    group: &FieldGroup<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<(Name, ConstValue)> {
    if group.primary().node.name.node == "__typename" {
        return Ok((
            Name::new(response_key),
            ConstValue::String(ctx.ty.name().to_string()),
        ));
    }

    let field_name = group.primary().node.name.node.as_str();
    let Some(field_def) = ctx.ty.field_by_name(field_name) else {
        return Err(ServerError::new(
            format!(
                "Could not find a field named {field_name} on {}",
                ctx.ty.name()
            ),
            Some(group.primary().node.name.pos),
        ));
    };

    let path_node = QueryPathNode::new(ctx.path, QueryPathSegmentRef::Name(response_key));
    let ctx_field = ContextField {
        parent_type: ctx.ty,
        field: field_def,
        item: group.primary(),
        field_selections: group.fields.as_slice(),
        stream: group.stream.as_ref(),
        base_path: ctx.base_path,
        path: Some(&path_node),
        schema_env: ctx.schema_env,
        query_env: ctx.query_env,
        errors: ctx.errors,
        deferred_workloads: ctx.deferred_workloads,
    };
    let value = field::resolve_field(&ctx_field, parent_value).await?;
    Ok((Name::new(response_key), value))
}
