//! Field resolvers and the values they produce.

use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use async_graphql_parser::types::Field;
use async_graphql_value::{ConstValue, Name, Variables};
use futures_util::{future::BoxFuture, stream::BoxStream};
use indexmap::IndexMap;
use serde_json::Value;

use super::{resolved_value::ResolvedValue, MetaField, MetaType, Registry};
use crate::{
    context::{ContextExt, ContextField},
    query_path::QueryPath,
    Positioned, Result,
};

/// What a resolver hands back to the engine.
///
/// A ready value and an awaited future both end up as `Value`; an async
/// producer of list items is a `Stream` and is only legal on list fields.
pub enum ResolverOutput {
    Value(ResolvedValue),
    Stream(BoxStream<'static, Result<Value>>),
}

impl ResolverOutput {
    pub fn value(value: impl Into<ResolvedValue>) -> Self {
        ResolverOutput::Value(value.into())
    }

    pub fn stream(stream: impl futures_util::Stream<Item = Result<Value>> + Send + 'static) -> Self {
        ResolverOutput::Stream(Box::pin(stream))
    }
}

impl From<Value> for ResolverOutput {
    fn from(value: Value) -> Self {
        ResolverOutput::Value(ResolvedValue::new(value))
    }
}

impl Debug for ResolverOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResolverOutput::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ResolverOutput::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}

/// Everything a resolver can see about the field it is resolving.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub(crate) ctx: &'a ContextField<'a>,
    pub(crate) parent_value: &'a ResolvedValue,
    pub(crate) args: &'a IndexMap<Name, ConstValue>,
}

impl<'a> ResolverContext<'a> {
    /// The parent object's resolved value.
    pub fn parent_value(&self) -> &'a ResolvedValue {
        self.parent_value
    }

    /// The coerced arguments of this field.
    pub fn args(&self) -> &'a IndexMap<Name, ConstValue> {
        self.args
    }

    /// One coerced argument by name.
    pub fn argument(&self, name: &str) -> Option<&'a ConstValue> {
        self.args.get(name)
    }

    /// The definition of the field being resolved.
    pub fn field(&self) -> &'a MetaField {
        self.ctx.field
    }

    /// The field selection in the query source.
    pub fn item(&self) -> &'a Positioned<Field> {
        self.ctx.item
    }

    /// The type the field was selected on.
    pub fn parent_type(&self) -> &'a MetaType {
        self.ctx.parent_type
    }

    /// The response path of this field, flattened.
    pub fn path(&self) -> QueryPath {
        self.ctx.flattened_path()
    }

    pub fn registry(&self) -> &'a Registry {
        &self.ctx.schema_env.registry
    }

    pub fn variables(&self) -> &'a Variables {
        &self.ctx.query_env.variables
    }

    /// Request-scoped data of the given type, if any was attached.
    pub fn data<D: Any + Send + Sync>(&self) -> Option<&'a D> {
        self.ctx.data_opt::<D>()
    }
}

/// A user supplied resolver.
#[async_trait::async_trait]
pub trait CustomResolver: Send + Sync {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<ResolverOutput>;
}

struct FnResolver<F>(F);

#[async_trait::async_trait]
impl<F> CustomResolver for FnResolver<F>
where
    F: for<'a> Fn(ResolverContext<'a>) -> BoxFuture<'a, Result<ResolverOutput>> + Send + Sync,
{
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<ResolverOutput> {
        (self.0)(ctx).await
    }
}

struct ConstantResolver(Value);

#[async_trait::async_trait]
impl CustomResolver for ConstantResolver {
    async fn resolve(&self, _ctx: ResolverContext<'_>) -> Result<ResolverOutput> {
        Ok(ResolverOutput::from(self.0.clone()))
    }
}

/// How a field obtains its value.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Read the matching property of the parent value. This is the default,
    /// and what the schema-wide default resolver (if any) replaces.
    #[default]
    Property,
    /// Pass the parent value through untouched. For fields that only exist to
    /// group their children.
    Parent,
    /// A user supplied resolver.
    Custom(Arc<dyn CustomResolver>),
}

impl Resolver {
    /// Wrap an async closure as a resolver.
    pub fn from_fn<F>(f: F) -> Resolver
    where
        F: for<'a> Fn(ResolverContext<'a>) -> BoxFuture<'a, Result<ResolverOutput>>
            + Send
            + Sync
            + 'static,
    {
        Resolver::Custom(Arc::new(FnResolver(f)))
    }

    /// A resolver that always returns the given JSON value.
    pub fn constant(value: Value) -> Resolver {
        Resolver::Custom(Arc::new(ConstantResolver(value)))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Resolver::Custom(_))
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Parent => f.write_str("Parent"),
            Resolver::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Picks the concrete object type for a value resolved at an abstract
/// (interface or union) position.
#[derive(Clone)]
pub struct TypeResolver(
    Arc<dyn Fn(&Value, &MetaType, &Registry) -> Option<String> + Send + Sync>,
);

impl TypeResolver {
    pub fn new(
        f: impl Fn(&Value, &MetaType, &Registry) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        TypeResolver(Arc::new(f))
    }

    pub fn resolve_type(
        &self,
        value: &Value,
        abstract_type: &MetaType,
        registry: &Registry,
    ) -> Option<String> {
        (self.0)(value, abstract_type, registry)
    }
}

impl Default for TypeResolver {
    /// The default type resolver reads the value's `__typename` property.
    fn default() -> Self {
        TypeResolver(Arc::new(|value, _, _| {
            value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }
}

impl Debug for TypeResolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver(..)")
    }
}
