use async_graphql_value::{ConstValue, Name};
use async_recursion::async_recursion;
use indexmap::IndexMap;

use super::list;
use crate::{
    context::{ContextExt, ContextField, ContextSelectionSet},
    query_path::{concat_path, QueryPathNode},
    registry::{
        input_resolution::resolve_input,
        resolved_value::ResolvedValue,
        resolvers::{Resolver, ResolverContext, ResolverOutput},
        scalars, MetaType, MetaTypeName,
    },
    Error, ServerError, ServerResult,
};

/// Resolve one grouped field: coerce its arguments, run its resolver and
/// complete the result against the declared type.
///
/// An error at a nullable field is absorbed here: it is recorded and the
/// field becomes null. Errors at non-null fields propagate to the caller.
pub(crate) async fn resolve_field(
    ctx: &ContextField<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    let result = resolve_field_inner(ctx, parent_value)
        .await
        .map_err(|error| ctx.set_error_path(error));

    match result {
        Ok(value) => Ok(value),
        Err(error) if ctx.field.ty.is_nullable() => {
            ctx.add_error(error);
            Ok(ConstValue::Null)
        }
        Err(error) => Err(error),
    }
}

async fn resolve_field_inner(
    ctx: &ContextField<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    let args = resolve_arguments(ctx)?;
    let output = run_field_resolver(ctx, &args, parent_value)
        .await
        .map_err(|error| error.into_server_error(ctx.item.pos))?;

    match output {
        ResolverOutput::Stream(stream) => list::resolve_stream_field(ctx, stream).await,
        ResolverOutput::Value(value) => {
            if let Some(stream) = ctx.stream {
                return list::resolve_streamed_list(ctx, stream, value).await;
            }
            complete_value(ctx, ctx.path, ctx.field.ty.as_str(), value).await
        }
    }
}

fn resolve_arguments(ctx: &ContextField<'_>) -> ServerResult<IndexMap<Name, ConstValue>> {
    let mut args = IndexMap::with_capacity(ctx.field.args.len());
    for definition in ctx.field.args.values() {
        let provided = ctx.item.node.get_argument(&definition.name).cloned();
        let pos = provided
            .as_ref()
            .map(|value| value.pos)
            .unwrap_or(ctx.item.pos);
        let value = provided
            .map(|value| ctx.resolve_input_value(value))
            .transpose()?;
        if let Some(value) = resolve_input(ctx.registry(), pos, &definition.name, definition, value)?
        {
            args.insert(Name::new(&definition.name), value);
        }
    }
    Ok(args)
}

async fn run_field_resolver(
    ctx: &ContextField<'_>,
    args: &IndexMap<Name, ConstValue>,
    parent_value: &ResolvedValue,
) -> Result<ResolverOutput, Error> {
    let resolver_ctx = ResolverContext {
        ctx,
        parent_value,
        args,
    };
    match &ctx.field.resolver {
        // Some fields just pass their parent's data down to their children.
        Resolver::Parent => Ok(ResolverOutput::Value(parent_value.clone())),
        Resolver::Property => match &ctx.schema_env.default_resolver {
            Some(default_resolver) => default_resolver.resolve(resolver_ctx).await,
            None => Ok(ResolverOutput::Value(
                parent_value
                    .get_field(ctx.field.target_field_name())
                    .unwrap_or_default(),
            )),
        },
        Resolver::Custom(resolver) => resolver.resolve(resolver_ctx).await,
    }
}

/// An error located at this field, carrying the given (possibly deeper than
/// the field's own) response path.
pub(super) fn error_at(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    message: impl Into<String>,
) -> ServerError {
    let mut error = ServerError::new(message, Some(ctx.item.pos));
    error.path = concat_path(ctx.base_path, path).into_iter().collect();
    error
}

pub(super) fn locate_error(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    error: Error,
) -> ServerError {
    let mut error = error.into_server_error(ctx.item.pos);
    error.path = concat_path(ctx.base_path, path).into_iter().collect();
    error
}

/// Recursively coerce a resolver value into its declared type.
///
/// `path` tracks where inside the field's value we are; it starts out as the
/// field's own path and grows an index per list level.
#[async_recursion]
pub(crate) async fn complete_value(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    ty: &str,
    value: ResolvedValue,
) -> ServerResult<ConstValue> {
    match MetaTypeName::create(ty) {
        MetaTypeName::NonNull(inner) => {
            if value.is_null() {
                tracing::warn!(
                    field = %ctx.item.node.name.node,
                    expected = ty,
                    path = %concat_path(ctx.base_path, path),
                    "a non-nullable value resolved to null"
                );
                return Err(error_at(
                    ctx,
                    path,
                    format!(
                        "An error occurred while fetching `{}`, a non-nullable value was expected \
                         but no value was found.",
                        ctx.item.node.name.node
                    ),
                ));
            }
            complete_value(ctx, path, inner, value).await
        }
        MetaTypeName::List(inner) => {
            if value.is_null() {
                return Ok(ConstValue::Null);
            }
            list::complete_list(ctx, path, inner, value).await
        }
        MetaTypeName::Named(type_name) => {
            if value.is_null() {
                return Ok(ConstValue::Null);
            }
            let Some(base_type) = ctx.schema_env.registry.lookup_type(type_name) else {
                return Err(error_at(ctx, path, format!("Unknown type \"{type_name}\"")));
            };
            match base_type {
                MetaType::Scalar(_) => scalars::serialize_scalar(type_name, value.take())
                    .map_err(|error| locate_error(ctx, path, error)),
                MetaType::Enum(enum_type) => match value.take() {
                    serde_json::Value::String(name) => {
                        if enum_type.value(&name).is_none() {
                            return Err(error_at(
                                ctx,
                                path,
                                format!("Resolver returned \"{name}\", expected enum \"{type_name}\""),
                            ));
                        }
                        Ok(ConstValue::Enum(Name::new(name)))
                    }
                    other => Err(error_at(
                        ctx,
                        path,
                        format!("Resolver returned {other}, expected enum \"{type_name}\""),
                    )),
                },
                MetaType::Object(_) => complete_object(ctx, path, base_type, value).await,
                MetaType::Interface(_) | MetaType::Union(_) => {
                    let concrete = resolve_concrete_type(ctx, path, base_type, &value)?;
                    complete_object(ctx, path, concrete, value).await
                }
                MetaType::InputObject(_) => Err(error_at(
                    ctx,
                    path,
                    format!("Field with input object type \"{type_name}\""),
                )),
            }
        }
    }
}

async fn complete_object(
    ctx: &ContextField<'_>,
    path: Option<&QueryPathNode<'_>>,
    object_type: &MetaType,
    value: ResolvedValue,
) -> ServerResult<ConstValue> {
    let items = ctx
        .field_selections
        .iter()
        .map(|field| &field.node.selection_set)
        .collect();
    let sub_ctx = ContextSelectionSet {
        ty: object_type,
        items,
        base_path: ctx.base_path,
        path,
        schema_env: ctx.schema_env,
        query_env: ctx.query_env,
        errors: ctx.errors,
        deferred_workloads: ctx.deferred_workloads,
    };
    super::resolve_container(&sub_ctx, &value).await
}

fn resolve_concrete_type<'a>(
    ctx: &ContextField<'a>,
    path: Option<&QueryPathNode<'_>>,
    abstract_type: &MetaType,
    value: &ResolvedValue,
) -> ServerResult<&'a MetaType> {
    let registry = &ctx.schema_env.registry;
    let Some(type_name) = ctx.schema_env.type_resolver.resolve_type(
        value.data_resolved(),
        abstract_type,
        registry,
    ) else {
        return Err(error_at(
            ctx,
            path,
            format!(
                "Could not resolve the concrete type of \"{}\"",
                abstract_type.name()
            ),
        ));
    };
    let Some(concrete) = registry.lookup_type(&type_name) else {
        return Err(error_at(
            ctx,
            path,
            format!("Type \"{type_name}\" is not defined in the schema"),
        ));
    };
    if concrete.object().is_none() {
        return Err(error_at(
            ctx,
            path,
            format!("Type \"{type_name}\" is not an object type"),
        ));
    }
    if !registry.is_possible_type(abstract_type, concrete.name()) {
        return Err(error_at(
            ctx,
            path,
            format!(
                "Type \"{type_name}\" is not a possible type of \"{}\"",
                abstract_type.name()
            ),
        ));
    }
    Ok(concrete)
}
