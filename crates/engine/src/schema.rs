//! The executor: request preparation, root dispatch and the streaming driver.

use std::sync::Arc;

use async_graphql_parser::{
    parse_query,
    types::{DocumentOperations, OperationDefinition, OperationType},
};
use async_graphql_value::{ConstValue, Name, Variables};
use futures_util::{
    stream::{BoxStream, FuturesUnordered},
    StreamExt,
};

use crate::{
    context::{ContextSelectionSet, Data, ErrorSink, QueryEnv, QueryEnvInner, SchemaEnv, SchemaEnvInner},
    deferred::{execute_workload, workload_channel, DeferredWorkloadSender},
    query_path::QueryPath,
    registry::{
        input_resolution::resolve_input,
        resolved_value::ResolvedValue,
        resolvers::{CustomResolver, TypeResolver},
        MetaInputValue, Registry,
    },
    resolver_utils::{resolve_container, resolve_container_serial},
    response::Response,
    streaming::StreamingPayload,
    validation::check_document,
    Positioned, Request, SchemaError, ServerError,
};

/// Builds a [`Schema`] out of a registry plus the schema-wide hooks.
pub struct SchemaBuilder {
    registry: Registry,
    data: Data,
    default_resolver: Option<Arc<dyn CustomResolver>>,
    type_resolver: TypeResolver,
}

impl SchemaBuilder {
    /// Attach data visible to every request executed against this schema.
    #[must_use]
    pub fn data<D: std::any::Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Replace the default property-reading field resolver.
    #[must_use]
    pub fn default_resolver(mut self, resolver: impl CustomResolver + 'static) -> Self {
        self.default_resolver = Some(Arc::new(resolver));
        self
    }

    /// Replace the default `__typename`-reading type resolver.
    #[must_use]
    pub fn type_resolver(mut self, resolver: TypeResolver) -> Self {
        self.type_resolver = resolver;
        self
    }

    pub fn finish(self) -> Result<Schema, SchemaError> {
        let registry = &self.registry;
        for (name, operation_type) in [
            (Some(registry.query_type.as_str()), "query"),
            (registry.mutation_type.as_deref(), "mutation"),
            (registry.subscription_type.as_deref(), "subscription"),
        ] {
            let Some(name) = name else { continue };
            let Some(root) = registry.lookup_type(name) else {
                return Err(SchemaError::UnknownRootType {
                    operation_type,
                    name: name.to_string(),
                });
            };
            if root.object().is_none() {
                return Err(SchemaError::InvalidRootType {
                    operation_type,
                    name: name.to_string(),
                });
            }
        }

        Ok(Schema(SchemaEnv(Arc::new(SchemaEnvInner {
            registry: self.registry,
            data: self.data,
            default_resolver: self.default_resolver,
            type_resolver: self.type_resolver,
        }))))
    }
}

/// An executable schema: the registry plus the schema-wide resolvers.
///
/// Cheap to clone; executing requests never mutates it.
#[derive(Clone)]
pub struct Schema(SchemaEnv);

impl Schema {
    pub fn build(registry: Registry) -> SchemaBuilder {
        SchemaBuilder {
            registry,
            data: Data::default(),
            default_resolver: None,
            type_resolver: TypeResolver::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }

    /// Execute a request to a single response.
    ///
    /// `@defer` and `@stream` read as absent: everything they cover is
    /// delivered inline.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        self.execute_once(request.into(), None).await.0
    }

    /// Execute a request to a sequence of streaming payloads.
    ///
    /// The first payload is the initial response; it announces with
    /// `hasNext: true` whether deferred or streamed payloads follow, in which
    /// case the sequence ends with a bare `{"hasNext": false}` payload.
    /// Interior payloads arrive in settlement order.
    pub fn execute_stream(&self, request: impl Into<Request>) -> BoxStream<'static, StreamingPayload> {
        let schema = self.clone();
        let request = request.into();
        Box::pin(async_stream::stream! {
            let (sender, mut receiver) = workload_channel();
            let (response, env) = schema.execute_once(request, Some(&sender)).await;

            let Some(env) = env else {
                yield response.into_streaming_payload(false);
                return;
            };

            let mut pending = FuturesUnordered::new();
            while let Some(workload) = receiver.receive() {
                pending.push(execute_workload(
                    workload,
                    schema.0.clone(),
                    env.clone(),
                    sender.clone(),
                ));
            }

            let has_next = !pending.is_empty();
            yield response.into_streaming_payload(has_next);
            if !has_next {
                return;
            }

            tracing::debug!("delivering deferred payloads");
            while let Some(payload) = pending.next().await {
                // Anything the settled workload registered (nested defers,
                // the next stream step) joins the race before we yield.
                while let Some(workload) = receiver.receive() {
                    pending.push(execute_workload(
                        workload,
                        schema.0.clone(),
                        env.clone(),
                        sender.clone(),
                    ));
                }
                if let Some(payload) = payload {
                    yield payload.into();
                }
            }

            yield StreamingPayload::completion();
        })
    }

    async fn execute_once(
        &self,
        request: Request,
        deferred_workloads: Option<&DeferredWorkloadSender>,
    ) -> (Response, Option<QueryEnv>) {
        let env = match self.prepare_request(request) {
            Ok(env) => env,
            Err(errors) => {
                tracing::debug!(errors = errors.len(), "request failed before execution");
                return (Response::from_errors(errors), None);
            }
        };

        let root_type_name = match env.operation.node.ty {
            OperationType::Query => Some(self.0.registry.query_type.as_str()),
            OperationType::Mutation => self.0.registry.mutation_type.as_deref(),
            OperationType::Subscription => self.0.registry.subscription_type.as_deref(),
        };
        let root_type = root_type_name.and_then(|name| self.0.registry.lookup_type(name));
        let Some(root_type) = root_type else {
            let error = ServerError::new(
                format!(
                    "Schema is not configured for {}s.",
                    env.operation.node.ty
                ),
                Some(env.operation.pos),
            );
            return (Response::from_server_error(error), None);
        };

        tracing::debug!(
            operation_type = %env.operation.node.ty,
            operation_name = env.operation_name.as_deref(),
            "executing operation"
        );

        let errors = ErrorSink::default();
        let base_path = QueryPath::empty();
        let ctx = ContextSelectionSet {
            ty: root_type,
            items: vec![&env.operation.node.selection_set],
            base_path: &base_path,
            path: None,
            schema_env: &self.0,
            query_env: &env,
            errors: &errors,
            deferred_workloads,
        };

        let result = match env.operation.node.ty {
            OperationType::Mutation => resolve_container_serial(&ctx, &env.root).await,
            _ => resolve_container(&ctx, &env.root).await,
        };
        let data = match result {
            Ok(data) => data,
            Err(error) => {
                // A non-null root field nulled the whole response out.
                errors.push(error);
                ConstValue::Null
            }
        };

        let response = Response {
            data: Some(data),
            errors: errors.into_vec(),
        };
        (response, Some(env))
    }

    fn prepare_request(&self, request: Request) -> Result<QueryEnv, Vec<ServerError>> {
        let document = parse_query(&request.query)
            .map_err(|error| vec![ServerError::new(error.to_string(), None)])?;

        let operation = select_operation(document.operations, request.operation_name.as_deref())
            .map_err(|error| vec![error])?;

        let variables = coerce_variables(&self.0.registry, &operation, request.variables)?;

        check_document(&self.0.registry, &operation, &document.fragments, &variables)
            .map_err(|error| vec![error])?;

        Ok(QueryEnv::new(QueryEnvInner {
            variables,
            operation_name: request.operation_name,
            operation,
            fragments: document.fragments,
            ctx_data: Arc::new(request.data),
            root: ResolvedValue::new(request.root.unwrap_or(serde_json::Value::Null)),
        }))
    }
}

fn select_operation(
    operations: DocumentOperations,
    operation_name: Option<&str>,
) -> Result<Positioned<OperationDefinition>, ServerError> {
    match operations {
        DocumentOperations::Single(operation) => match operation_name {
            None => Ok(operation),
            Some(name) => Err(ServerError::new(
                format!("Unknown operation named \"{name}\"."),
                None,
            )),
        },
        DocumentOperations::Multiple(mut operations) => match operation_name {
            Some(name) => operations.remove(name).ok_or_else(|| {
                ServerError::new(format!("Unknown operation named \"{name}\"."), None)
            }),
            None => {
                let mut operations = operations.into_iter();
                match (operations.next(), operations.next()) {
                    (Some((_, operation)), None) => Ok(operation),
                    _ => Err(ServerError::new(
                        "Must provide operation name if query contains multiple operations.",
                        None,
                    )),
                }
            }
        },
    }
}

fn coerce_variables(
    registry: &Registry,
    operation: &Positioned<OperationDefinition>,
    provided: Variables,
) -> Result<Variables, Vec<ServerError>> {
    let mut variables = Variables::default();
    let mut errors = Vec::new();

    for definition in &operation.node.variable_definitions {
        let name = definition.node.name.node.as_str();
        let input_definition = {
            let mut input = MetaInputValue::new(name, definition.node.var_type.node.to_string());
            if let Some(default) = definition.node.default_value() {
                input = input.with_default(default.clone());
            }
            input
        };
        let value = provided.get(name).cloned();
        match resolve_input(registry, definition.pos, name, &input_definition, value) {
            Ok(Some(value)) => {
                variables.insert(Name::new(name), value);
            }
            Ok(None) => {}
            Err(mut error) => {
                error.message = format!("Variable \"${name}\": {}", error.message);
                errors.push(error);
            }
        }
    }

    if errors.is_empty() {
        Ok(variables)
    } else {
        Err(errors)
    }
}
