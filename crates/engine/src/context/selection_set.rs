use std::fmt::{self, Formatter};

use async_graphql_parser::types::SelectionSet;

use super::{Context, ErrorSink, QueryEnv, SchemaEnv};
use crate::{
    deferred::DeferredWorkloadSender,
    query_path::{QueryPath, QueryPathNode},
    registry::MetaType,
    Positioned,
};

/// The context for resolving one object's selections.
///
/// `items` usually holds a single selection set; when several selections of
/// the same response key merged into one group, it holds the selection set of
/// each of them, walked in order.
#[derive(Clone)]
pub struct ContextSelectionSet<'a> {
    /// The runtime object type the selections apply to.
    pub ty: &'a MetaType,
    /// The selection sets being resolved.
    pub items: Vec<&'a Positioned<SelectionSet>>,
    /// The path this pass was registered at; empty for the immediate pass.
    pub base_path: &'a QueryPath,
    /// The in-flight path below `base_path`.
    pub path: Option<&'a QueryPathNode<'a>>,
    /// Context scoped to the current schema.
    pub schema_env: &'a SchemaEnv,
    /// Context scoped to the current request.
    pub query_env: &'a QueryEnv,
    /// Where absorbed field errors of this pass accumulate.
    pub errors: &'a ErrorSink,
    /// Registration half of the dispatcher; `None` when incremental delivery
    /// is unavailable, which renders `@defer`/`@stream` inert.
    pub deferred_workloads: Option<&'a DeferredWorkloadSender>,
}

impl<'a> Context<'a> for ContextSelectionSet<'a> {
    fn base_path(&self) -> &'a QueryPath {
        self.base_path
    }

    fn path_node(&self) -> Option<&'a QueryPathNode<'a>> {
        self.path
    }

    fn query_env(&self) -> &'a QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &'a SchemaEnv {
        self.schema_env
    }

    fn error_sink(&self) -> &'a ErrorSink {
        self.errors
    }

    fn deferred_workloads(&self) -> Option<&'a DeferredWorkloadSender> {
        self.deferred_workloads
    }
}

impl fmt::Debug for ContextSelectionSet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSelectionSet")
            .field("ty", &self.ty.name())
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}
