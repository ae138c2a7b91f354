//! Collection of the fields to execute against one object.
//!
//! Pure with respect to resolvers: the collector only walks the selection
//! sets, applies `@skip`/`@include`, groups fields by response key in
//! first-appearance order and splits off deferred fragments.

use std::collections::HashSet;

use async_graphql_parser::types::{Directive, Field, Selection, SelectionSet};
use indexmap::IndexMap;

use crate::{
    context::{ContextExt, ContextSelectionSet},
    directives::{self, StreamDirective},
    registry::{MetaType, Registry},
    Pos, Positioned, ServerError, ServerResult,
};

/// How the collected fields will be executed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectMode {
    Parallel,
    /// The mutation root. Fields run one after another and `@defer`/`@stream`
    /// read as absent at this level only.
    Serial,
}

/// All selections that share one response key.
pub(crate) struct FieldGroup<'a> {
    pub fields: Vec<&'a Positioned<Field>>,
    pub stream: Option<StreamDirective>,
}

impl<'a> FieldGroup<'a> {
    /// The selection providing the arguments and error locations.
    pub fn primary(&self) -> &'a Positioned<Field> {
        self.fields[0]
    }
}

/// A fragment that will be delivered as its own payload instead of being
/// executed in place.
pub(crate) struct DeferredFragment<'a> {
    pub label: Option<String>,
    pub selection_set: &'a Positioned<SelectionSet>,
}

#[derive(Default)]
pub(crate) struct CollectedFields<'a> {
    /// Response key to group, in first-appearance order of the key.
    pub groups: IndexMap<&'a str, FieldGroup<'a>>,
    pub deferred: Vec<DeferredFragment<'a>>,
}

pub(crate) fn collect_fields<'a>(
    ctx: &ContextSelectionSet<'a>,
    mode: CollectMode,
) -> ServerResult<CollectedFields<'a>> {
    let mut collector = Collector {
        registry: ctx.registry(),
        ctx,
        mode,
        // Without a workload sender there is nowhere to deliver patches, so
        // incremental directives read as absent and content stays inline.
        incremental: ctx.deferred_workloads.is_some(),
        collected: CollectedFields::default(),
        visited: HashSet::new(),
    };
    for set in &ctx.items {
        collector.add_set(set)?;
    }
    Ok(collector.collected)
}

struct Collector<'a, 'b> {
    registry: &'a Registry,
    ctx: &'b ContextSelectionSet<'a>,
    mode: CollectMode,
    incremental: bool,
    collected: CollectedFields<'a>,
    visited: HashSet<&'a str>,
}

impl<'a> Collector<'a, '_> {
    fn add_set(&mut self, set: &'a Positioned<SelectionSet>) -> ServerResult<()> {
        let variables = &self.ctx.query_env.variables;
        for selection in &set.node.items {
            if directives::is_skipped(self.registry, variables, selection.node.directives())? {
                continue;
            }
            match &selection.node {
                Selection::Field(field) => {
                    let stream = if self.incremental && self.mode == CollectMode::Parallel {
                        directives::stream_directive(self.registry, variables, &field.node.directives)?
                    } else {
                        None
                    };
                    self.add_field(field, stream)?;
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    let Some(fragment) = self.ctx.get_fragment(name) else {
                        return Err(ServerError::new(
                            format!("Unknown fragment \"{name}\"."),
                            Some(spread.pos),
                        ));
                    };
                    if !self.type_condition_matches(&fragment.node.type_condition.node.on.node) {
                        continue;
                    }
                    if let Some(deferred) =
                        self.check_defer(&spread.node.directives, &fragment.node.selection_set)?
                    {
                        self.collected.deferred.push(deferred);
                        continue;
                    }
                    if !self.visited.insert(name) {
                        // Cycle (or repetition) guard.
                        continue;
                    }
                    self.add_set(&fragment.node.selection_set)?;
                }
                Selection::InlineFragment(inline) => {
                    if let Some(condition) = &inline.node.type_condition {
                        if !self.type_condition_matches(&condition.node.on.node) {
                            continue;
                        }
                    }
                    if let Some(deferred) =
                        self.check_defer(&inline.node.directives, &inline.node.selection_set)?
                    {
                        self.collected.deferred.push(deferred);
                        continue;
                    }
                    self.add_set(&inline.node.selection_set)?;
                }
            }
        }
        Ok(())
    }

    fn check_defer(
        &self,
        directives: &[Positioned<Directive>],
        selection_set: &'a Positioned<SelectionSet>,
    ) -> ServerResult<Option<DeferredFragment<'a>>> {
        if !self.incremental || self.mode == CollectMode::Serial {
            return Ok(None);
        }
        let variables = &self.ctx.query_env.variables;
        Ok(
            directives::defer_directive(self.registry, variables, directives)?.map(|defer| {
                DeferredFragment {
                    label: defer.label,
                    selection_set,
                }
            }),
        )
    }

    fn add_field(
        &mut self,
        field: &'a Positioned<Field>,
        stream: Option<StreamDirective>,
    ) -> ServerResult<()> {
        let response_key = field.node.response_key().node.as_str();
        match self.collected.groups.entry(response_key) {
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(FieldGroup {
                    fields: vec![field],
                    stream,
                });
            }
            indexmap::map::Entry::Occupied(mut entry) => {
                let group = entry.get_mut();
                let locations = || -> Vec<Pos> {
                    group
                        .fields
                        .iter()
                        .map(|field| field.pos)
                        .chain(std::iter::once(field.pos))
                        .collect()
                };
                let first_name = group.primary().node.name.node.as_str();
                if field.node.name.node != first_name {
                    return Err(ServerError::new_with_locations(
                        format!(
                            "Fields \"{response_key}\" conflict because \"{first_name}\" and \
                             \"{}\" are different fields. Use different aliases on the fields to \
                             fetch both if this was intentional.",
                            field.node.name.node
                        ),
                        locations(),
                    ));
                }
                if group.stream != stream {
                    return Err(ServerError::new_with_locations(
                        format!(
                            "Fields \"{first_name}\" conflict because they have differing stream \
                             directives. Use different aliases on the fields to fetch both if \
                             this was intentional."
                        ),
                        locations(),
                    ));
                }
                group.fields.push(field);
            }
        }
        Ok(())
    }

    fn type_condition_matches(&self, condition: &str) -> bool {
        let parent = self.ctx.ty;
        if parent.name() == condition {
            return true;
        }
        match self.registry.lookup_type(condition) {
            Some(condition_type @ (MetaType::Interface(_) | MetaType::Union(_))) => {
                self.registry.is_possible_type(condition_type, parent.name())
            }
            _ => false,
        }
    }
}
