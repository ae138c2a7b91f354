//! A GraphQL execution engine with incremental delivery.
//!
//! The engine takes a parsed request, a runtime type [`Registry`] and
//! JSON-producing resolvers, and executes it to either a single [`Response`]
//! or, through [`Schema::execute_stream`], an initial response followed by an
//! ordered stream of `@defer`/`@stream` payloads.

mod context;
mod deferred;
mod directives;
mod error;
mod query_path;
pub mod registry;
mod request;
mod resolver_utils;
mod response;
mod schema;
mod streaming;
mod validation;

pub use async_graphql_parser::{Pos, Positioned};
pub use async_graphql_value::{ConstValue, Name, Variables};

pub use context::{Context, ContextExt, ContextField, ContextSelectionSet, Data};
pub use deferred::{workload_channel, DeferredWorkload, DeferredWorkloadReceiver, DeferredWorkloadSender};
pub use directives::{DeferDirective, StreamDirective};
pub use error::{Error, ErrorExtensionValues, Result, SchemaError, ServerError, ServerResult};
pub use query_path::{QueryPath, QueryPathNode, QueryPathSegment, QueryPathSegmentRef};
pub use registry::{
    resolved_value::ResolvedValue,
    resolvers::{CustomResolver, Resolver, ResolverContext, ResolverOutput, TypeResolver},
    EnumType, InputObjectType, InterfaceType, MetaDirective, MetaEnumValue, MetaField,
    MetaFieldType, MetaInputValue, MetaType, ObjectType, Registry, ScalarType, UnionType,
};
pub use request::Request;
pub use response::Response;
pub use schema::{Schema, SchemaBuilder};
pub use streaming::{CompletionPayload, IncrementalPayload, InitialResponse, StreamingPayload};
