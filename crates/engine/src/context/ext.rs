use std::any::Any;

use async_graphql_parser::{
    types::FragmentDefinition,
    Pos,
};
use async_graphql_value::{ConstValue, Value as InputValue};

use super::{ErrorSink, QueryEnv, SchemaEnv};
use crate::{
    deferred::DeferredWorkloadSender,
    query_path::{concat_path, QueryPath, QueryPathNode},
    registry::Registry,
    Positioned, ServerError, ServerResult,
};

/// The state every context flavour carries.
pub trait Context<'a> {
    /// The path this workload was registered at; empty for the immediate pass.
    fn base_path(&self) -> &'a QueryPath;
    /// The in-flight path below `base_path`.
    fn path_node(&self) -> Option<&'a QueryPathNode<'a>>;
    fn query_env(&self) -> &'a QueryEnv;
    fn schema_env(&self) -> &'a SchemaEnv;
    fn error_sink(&self) -> &'a ErrorSink;
    fn deferred_workloads(&self) -> Option<&'a DeferredWorkloadSender>;
}

/// Shared behaviour of [`ContextSelectionSet`](super::ContextSelectionSet) and
/// [`ContextField`](super::ContextField).
pub trait ContextExt<'a>: Context<'a> {
    fn registry(&self) -> &'a Registry {
        &self.schema_env().registry
    }

    /// Find a fragment definition by name.
    fn get_fragment(&self, name: &str) -> Option<&'a Positioned<FragmentDefinition>> {
        self.query_env().fragments.get(name)
    }

    /// The absolute response path at this point.
    fn flattened_path(&self) -> QueryPath {
        concat_path(self.base_path(), self.path_node())
    }

    /// Attach the current response path to an error that does not have one.
    fn set_error_path(&self, error: ServerError) -> ServerError {
        if !error.path.is_empty() {
            return error;
        }

        ServerError {
            path: self.flattened_path().into_iter().collect(),
            ..error
        }
    }

    /// Report a field error that has been absorbed at this (nullable) point.
    fn add_error(&self, error: ServerError) {
        self.error_sink().push(error);
    }

    /// Look up a variable value. Variables have been coerced before execution
    /// starts, so defaults are already applied.
    fn var_value(&self, name: &str, pos: Pos) -> ServerResult<ConstValue> {
        self.query_env()
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| ServerError::new(format!("Variable {name} is not defined."), Some(pos)))
    }

    /// Substitute variable references inside an input value.
    fn resolve_input_value(&self, value: Positioned<InputValue>) -> ServerResult<ConstValue> {
        let pos = value.pos;
        value.node.into_const_with(|name| self.var_value(&name, pos))
    }

    /// Request- or schema-scoped data of the given type.
    fn data_opt<D: Any + Send + Sync>(&self) -> Option<&'a D> {
        self.query_env()
            .ctx_data
            .get_opt::<D>()
            .or_else(|| self.schema_env().data.get_opt::<D>())
    }
}

impl<'a, T> ContextExt<'a> for T where T: Context<'a> + ?Sized {}
