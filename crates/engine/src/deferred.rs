//! Deferred workloads: the registration half of incremental delivery.
//!
//! Execution registers workloads while the current payload is being produced;
//! the driver in `schema.rs` races the registered executions and emits their
//! payloads in settlement order.

use async_graphql_parser::types::{Field, SelectionSet};
use async_graphql_value::ConstValue;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures_util::{stream::BoxStream, StreamExt};
use serde_json::Value;

use crate::{
    context::{ContextField, ContextSelectionSet, ErrorSink, QueryEnv, SchemaEnv},
    query_path::{QueryPath, QueryPathNode, QueryPathSegmentRef},
    registry::{resolved_value::ResolvedValue, MetaFieldType, MetaType, MetaTypeName},
    resolver_utils::{complete_value, resolve_container},
    streaming::IncrementalPayload,
    Error, Positioned, Result, ServerError,
};

/// A unit of work whose result is delivered as its own payload.
pub struct DeferredWorkload {
    pub label: Option<String>,
    /// The response path the workload was registered at. For fragments this
    /// is where the patch grafts in; for list items the element index is
    /// appended per payload.
    pub path: QueryPath,
    kind: WorkloadKind,
}

enum WorkloadKind {
    /// A `@defer`red fragment to execute against its parent object.
    Fragment {
        parent_type: String,
        parent_value: ResolvedValue,
        selection_set: Positioned<SelectionSet>,
    },
    /// One already-materialized element of a `@stream`ed list.
    ListItem {
        parent_type: String,
        field_selections: Vec<Positioned<Field>>,
        item_type: MetaFieldType,
        index: usize,
        item: ResolvedValue,
    },
    /// The live tail of a `@stream`ed async sequence. Executing one step
    /// emits one patch and re-registers the rest of the tail, so control
    /// returns to the driver between steps.
    StreamTail {
        parent_type: String,
        field_selections: Vec<Positioned<Field>>,
        item_type: MetaFieldType,
        next_index: usize,
        stream: BoxStream<'static, Result<Value>>,
    },
}

impl DeferredWorkload {
    pub(crate) fn fragment(
        label: Option<String>,
        path: QueryPath,
        parent_type: String,
        parent_value: ResolvedValue,
        selection_set: Positioned<SelectionSet>,
    ) -> Self {
        DeferredWorkload {
            label,
            path,
            kind: WorkloadKind::Fragment {
                parent_type,
                parent_value,
                selection_set,
            },
        }
    }

    pub(crate) fn list_item(
        label: Option<String>,
        path: QueryPath,
        parent_type: String,
        field_selections: Vec<Positioned<Field>>,
        item_type: MetaFieldType,
        index: usize,
        item: ResolvedValue,
    ) -> Self {
        DeferredWorkload {
            label,
            path,
            kind: WorkloadKind::ListItem {
                parent_type,
                field_selections,
                item_type,
                index,
                item,
            },
        }
    }

    pub(crate) fn stream_tail(
        label: Option<String>,
        path: QueryPath,
        parent_type: String,
        field_selections: Vec<Positioned<Field>>,
        item_type: MetaFieldType,
        next_index: usize,
        stream: BoxStream<'static, Result<Value>>,
    ) -> Self {
        DeferredWorkload {
            label,
            path,
            kind: WorkloadKind::StreamTail {
                parent_type,
                field_selections,
                item_type,
                next_index,
                stream,
            },
        }
    }
}

#[derive(Clone)]
pub struct DeferredWorkloadSender(UnboundedSender<DeferredWorkload>);

impl DeferredWorkloadSender {
    pub fn send(&self, workload: DeferredWorkload) -> Result<(), Error> {
        self.0
            .unbounded_send(workload)
            .map_err(|error| Error::new(error.to_string()))
    }
}

pub struct DeferredWorkloadReceiver(UnboundedReceiver<DeferredWorkload>);

impl DeferredWorkloadReceiver {
    pub fn receive(&mut self) -> Option<DeferredWorkload> {
        self.0.try_next().ok().flatten()
    }
}

pub fn workload_channel() -> (DeferredWorkloadSender, DeferredWorkloadReceiver) {
    let (sender, receiver) = futures::channel::mpsc::unbounded();
    (
        DeferredWorkloadSender(sender),
        DeferredWorkloadReceiver(receiver),
    )
}

/// Execute one workload to a payload.
///
/// Every workload runs with a fresh error sink so its errors travel with its
/// own payload. `None` means the workload produced nothing to deliver (a
/// stream that reported completion).
pub(crate) async fn execute_workload(
    workload: DeferredWorkload,
    schema_env: SchemaEnv,
    query_env: QueryEnv,
    sender: DeferredWorkloadSender,
) -> Option<IncrementalPayload> {
    let errors = ErrorSink::default();
    let DeferredWorkload { label, path, kind } = workload;

    match kind {
        WorkloadKind::Fragment {
            parent_type,
            parent_value,
            selection_set,
        } => {
            let Some(ty) = schema_env.registry.lookup_type(&parent_type) else {
                return Some(internal_error_payload(label, path, &parent_type));
            };
            let ctx = ContextSelectionSet {
                ty,
                items: vec![&selection_set],
                base_path: &path,
                path: None,
                schema_env: &schema_env,
                query_env: &query_env,
                errors: &errors,
                deferred_workloads: Some(&sender),
            };
            let data = match resolve_container(&ctx, &parent_value).await {
                Ok(data) => data,
                Err(error) => {
                    errors.push(error);
                    ConstValue::Null
                }
            };
            Some(IncrementalPayload {
                data,
                path,
                label,
                errors: errors.into_vec(),
                has_next: true,
            })
        }
        WorkloadKind::ListItem {
            parent_type,
            field_selections,
            item_type,
            index,
            item,
        } => {
            let (data, _) = complete_element(
                &schema_env,
                &query_env,
                &sender,
                &errors,
                &parent_type,
                &field_selections,
                &item_type,
                &path,
                index,
                item,
            )
            .await;
            Some(IncrementalPayload {
                data,
                path: path.child(index),
                label,
                errors: errors.into_vec(),
                has_next: true,
            })
        }
        WorkloadKind::StreamTail {
            parent_type,
            field_selections,
            item_type,
            next_index,
            mut stream,
        } => match stream.next().await {
            // The source is done: nothing to deliver, the tail deregisters
            // itself by not re-registering.
            None => None,
            Some(Ok(value)) => {
                let (data, failed_non_null) = complete_element(
                    &schema_env,
                    &query_env,
                    &sender,
                    &errors,
                    &parent_type,
                    &field_selections,
                    &item_type,
                    &path,
                    next_index,
                    ResolvedValue::new(value),
                )
                .await;
                if !failed_non_null {
                    // Schedule the next step. The send only fails when the
                    // driver is gone, in which case there is no one left to
                    // deliver to anyway.
                    let _ = sender.send(DeferredWorkload::stream_tail(
                        label.clone(),
                        path.clone(),
                        parent_type,
                        field_selections,
                        item_type,
                        next_index + 1,
                        stream,
                    ));
                }
                Some(IncrementalPayload {
                    data,
                    path: path.child(next_index),
                    label,
                    errors: errors.into_vec(),
                    has_next: true,
                })
            }
            Some(Err(error)) => {
                // A failing source is not asked for more elements.
                let pos = field_selections
                    .first()
                    .map(|field| field.pos)
                    .unwrap_or_default();
                let mut error = error.into_server_error(pos);
                error.path = path.child(next_index).into_iter().collect();
                Some(IncrementalPayload {
                    data: ConstValue::Null,
                    path: path.child(next_index),
                    label,
                    errors: vec![error],
                    has_next: true,
                })
            }
        },
    }
}

/// Complete one streamed list element against its item type. Returns the
/// completed value (null on error) and whether a non-null completion failure
/// should stop a live stream.
#[allow(clippy::too_many_arguments)]
async fn complete_element(
    schema_env: &SchemaEnv,
    query_env: &QueryEnv,
    sender: &DeferredWorkloadSender,
    errors: &ErrorSink,
    parent_type: &str,
    field_selections: &[Positioned<Field>],
    item_type: &MetaFieldType,
    path: &QueryPath,
    index: usize,
    item: ResolvedValue,
) -> (ConstValue, bool) {
    let Some((parent, field)) = lookup_field(&schema_env.registry, parent_type, field_selections)
    else {
        errors.push(ServerError::new(
            format!("Internal error: lost track of the streamed field on \"{parent_type}\""),
            None,
        ));
        return (ConstValue::Null, true);
    };

    let selection_refs: Vec<&Positioned<Field>> = field_selections.iter().collect();
    let ctx = ContextField {
        parent_type: parent,
        field,
        item: selection_refs[0],
        field_selections: selection_refs.as_slice(),
        stream: None,
        base_path: path,
        path: None,
        schema_env,
        query_env,
        errors,
        deferred_workloads: Some(sender),
    };
    let index_node = QueryPathNode::new(None, QueryPathSegmentRef::Index(index));
    match complete_value(&ctx, Some(&index_node), item_type.as_str(), item).await {
        Ok(value) => (value, false),
        Err(error) => {
            errors.push(error);
            (
                ConstValue::Null,
                MetaTypeName::create(item_type.as_str()).is_non_null(),
            )
        }
    }
}

fn lookup_field<'a>(
    registry: &'a crate::registry::Registry,
    parent_type: &str,
    field_selections: &[Positioned<Field>],
) -> Option<(&'a MetaType, &'a crate::registry::MetaField)> {
    let parent = registry.lookup_type(parent_type)?;
    let field = parent.field_by_name(field_selections.first()?.node.name.node.as_str())?;
    Some((parent, field))
}

fn internal_error_payload(
    label: Option<String>,
    path: QueryPath,
    parent_type: &str,
) -> IncrementalPayload {
    IncrementalPayload {
        data: ConstValue::Null,
        path,
        label,
        errors: vec![ServerError::new(
            format!("Internal error: unknown deferred parent type \"{parent_type}\""),
            None,
        )],
        has_next: true,
    }
}
