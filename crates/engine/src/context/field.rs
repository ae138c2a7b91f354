use std::fmt::{self, Formatter};

use async_graphql_parser::types::Field;

use super::{Context, ErrorSink, QueryEnv, SchemaEnv};
use crate::{
    deferred::DeferredWorkloadSender,
    directives::StreamDirective,
    query_path::{QueryPath, QueryPathNode},
    registry::{MetaField, MetaType},
    Positioned,
};

/// The context for resolving one grouped field.
#[derive(Clone, Copy)]
pub struct ContextField<'a> {
    /// The type the field was selected on.
    pub parent_type: &'a MetaType,
    /// The definition of the field.
    pub field: &'a MetaField,
    /// The first selection of the group; arguments and the error location
    /// come from here.
    pub item: &'a Positioned<Field>,
    /// Every selection merged into this group, in document order. Their
    /// selection sets together form the sub-selection of the field.
    pub field_selections: &'a [&'a Positioned<Field>],
    /// The resolved `@stream` directive of the group, if any.
    pub stream: Option<&'a StreamDirective>,
    /// The path this pass was registered at; empty for the immediate pass.
    pub base_path: &'a QueryPath,
    /// The in-flight path below `base_path`, ending at this field's response
    /// key.
    pub path: Option<&'a QueryPathNode<'a>>,
    pub schema_env: &'a SchemaEnv,
    pub query_env: &'a QueryEnv,
    pub errors: &'a ErrorSink,
    pub deferred_workloads: Option<&'a DeferredWorkloadSender>,
}

impl<'a> ContextField<'a> {
    /// The key under which this field appears in the response.
    pub fn response_key(&self) -> &'a str {
        self.item.node.response_key().node.as_str()
    }
}

impl<'a> Context<'a> for ContextField<'a> {
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

impl fmt::Debug for ContextField<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextField")
            .field("parent_type", &self.parent_type.name())
            .field("field", &self.field.name)
            .finish_non_exhaustive()
    }
}
