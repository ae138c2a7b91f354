//! Request-scoped execution state.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_graphql_parser::types::{FragmentDefinition, OperationDefinition};
use async_graphql_value::{Name, Variables};
use fnv::FnvHashMap;

pub use self::{
    ext::{Context, ContextExt},
    field::ContextField,
    selection_set::ContextSelectionSet,
};
use crate::{
    registry::{
        resolved_value::ResolvedValue,
        resolvers::{CustomResolver, TypeResolver},
        Registry,
    },
    Positioned, ServerError,
};

mod ext;
mod field;
mod selection_set;

/// Schema/request data.
///
/// This is a type map, allowing you to store anything inside it.
#[derive(Default)]
pub struct Data(FnvHashMap<TypeId, Box<dyn Any + Sync + Send>>);

impl Data {
    /// Insert data.
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    pub(crate) fn get_opt<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.0
            .get(&TypeId::of::<D>())
            .and_then(|data| data.downcast_ref::<D>())
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").finish()
    }
}

#[doc(hidden)]
pub struct SchemaEnvInner {
    pub registry: Registry,
    pub data: Data,
    pub default_resolver: Option<Arc<dyn CustomResolver>>,
    pub type_resolver: TypeResolver,
}

/// Context scoped to the schema, shared by every request.
#[derive(Clone)]
pub struct SchemaEnv(pub(crate) Arc<SchemaEnvInner>);

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[doc(hidden)]
pub struct QueryEnvInner {
    pub variables: Variables,
    pub operation_name: Option<String>,
    pub operation: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    pub ctx_data: Arc<Data>,
    pub root: ResolvedValue,
}

/// Context scoped to a single request, shared by the immediate pass and by
/// every deferred workload spawned from it.
#[derive(Clone)]
pub struct QueryEnv(Arc<QueryEnvInner>);

impl Deref for QueryEnv {
    type Target = QueryEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl QueryEnv {
    pub fn new(inner: QueryEnvInner) -> QueryEnv {
        QueryEnv(Arc::new(inner))
    }
}

/// The append-only error list of one execution pass.
///
/// The immediate pass owns one sink; every deferred workload gets a fresh one
/// so its errors travel with its own payload. Execution is cooperative but
/// sibling futures share the sink, hence the mutex.
#[derive(Default)]
pub struct ErrorSink(Mutex<Vec<ServerError>>);

impl ErrorSink {
    pub fn push(&self, error: ServerError) {
        self.0.lock().unwrap().push(error);
    }

    pub fn into_vec(self) -> Vec<ServerError> {
        self.0.into_inner().unwrap()
    }
}
