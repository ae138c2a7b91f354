//! Pre-execution checks of the executor-recognized directives.
//!
//! Runs after variable coercion and before any resolver: the whole request is
//! rejected (no `data`) when selections that merge under one response key
//! disagree about streaming, when `@defer`/`@stream` appear somewhere they
//! cannot work, or when a directive is not known to the schema.

use std::collections::{HashMap, HashSet};

use async_graphql_parser::types::{
    Directive, Field, FragmentDefinition, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql_value::{Name, Variables};
use indexmap::IndexMap;

use crate::{
    directives::{self, StreamDirective},
    registry::{DirectiveLocation, MetaField, MetaType, Registry},
    Pos, Positioned, ServerError, ServerResult,
};

pub(crate) fn check_document(
    registry: &Registry,
    operation: &Positioned<OperationDefinition>,
    fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &Variables,
) -> ServerResult<()> {
    let root_type_name = match operation.node.ty {
        OperationType::Query => Some(registry.query_type.as_str()),
        OperationType::Mutation => registry.mutation_type.as_deref(),
        OperationType::Subscription => registry.subscription_type.as_deref(),
    };
    let checker = DocumentChecker {
        registry,
        fragments,
        variables,
    };
    checker.check_scope(
        root_type_name.and_then(|name| registry.lookup_type(name)),
        &[&operation.node.selection_set],
        operation.node.ty == OperationType::Mutation,
    )
}

struct DocumentChecker<'a> {
    registry: &'a Registry,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a Variables,
}

/// One same-key entry of a merge scope.
struct GroupEntry<'a> {
    field: &'a Positioned<Field>,
    stream: Option<StreamDirective>,
    definition: Option<&'a MetaField>,
}

impl<'a> DocumentChecker<'a> {
    /// Check one merge scope: every selection that can contribute fields to
    /// the same response object. Deferred fragments form their own scope, the
    /// way they form their own payload at runtime.
    fn check_scope(
        &self,
        parent: Option<&'a MetaType>,
        sets: &[&'a Positioned<SelectionSet>],
        serial_root: bool,
    ) -> ServerResult<()> {
        let mut groups: IndexMap<&'a str, Vec<GroupEntry<'a>>> = IndexMap::new();
        let mut visited = HashSet::new();
        for set in sets {
            self.flatten_into(parent, set, serial_root, &mut groups, &mut visited)?;
        }

        for (response_key, entries) in &groups {
            self.check_group(response_key, entries)?;

            // Recurse into the merged sub-selection of the group.
            let sub_sets: Vec<_> = entries
                .iter()
                .map(|entry| &entry.field.node.selection_set)
                .filter(|set| !set.node.items.is_empty())
                .collect();
            if !sub_sets.is_empty() {
                let sub_parent = entries
                    .iter()
                    .find_map(|entry| entry.definition)
                    .and_then(|definition| self.registry.lookup(&definition.ty));
                self.check_scope(sub_parent, &sub_sets, false)?;
            }
        }
        Ok(())
    }

    fn flatten_into(
        &self,
        parent: Option<&'a MetaType>,
        set: &'a Positioned<SelectionSet>,
        serial_root: bool,
        groups: &mut IndexMap<&'a str, Vec<GroupEntry<'a>>>,
        visited: &mut HashSet<&'a str>,
    ) -> ServerResult<()> {
        for selection in &set.node.items {
            let location = match &selection.node {
                Selection::Field(_) => DirectiveLocation::Field,
                Selection::FragmentSpread(_) => DirectiveLocation::FragmentSpread,
                Selection::InlineFragment(_) => DirectiveLocation::InlineFragment,
            };
            self.check_directives(selection.node.directives(), location)?;

            if directives::is_skipped(self.registry, self.variables, selection.node.directives())? {
                continue;
            }

            match &selection.node {
                Selection::Field(field) => {
                    let stream = if serial_root {
                        None
                    } else {
                        directives::stream_directive(
                            self.registry,
                            self.variables,
                            &field.node.directives,
                        )?
                    };
                    let definition =
                        parent.and_then(|parent| parent.field_by_name(&field.node.name.node));
                    if stream.is_some() {
                        if let Some(definition) = definition {
                            if !definition.ty.is_list() {
                                return Err(ServerError::new(
                                    format!(
                                        "Directive \"stream\" may not be used on non-list field \"{}\"",
                                        field.node.name.node
                                    ),
                                    Some(field.pos),
                                ));
                            }
                        }
                    }
                    groups
                        .entry(field.node.response_key().node.as_str())
                        .or_default()
                        .push(GroupEntry {
                            field,
                            stream,
                            definition,
                        });
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    let Some(fragment) = self.fragments.get(name) else {
                        return Err(ServerError::new(
                            format!("Unknown fragment \"{name}\"."),
                            Some(spread.pos),
                        ));
                    };
                    let condition =
                        self.condition_type(Some(&fragment.node.type_condition.node.on.node));
                    let deferred = !serial_root
                        && directives::defer_directive(
                            self.registry,
                            self.variables,
                            &spread.node.directives,
                        )?
                        .is_some();
                    if deferred {
                        self.check_scope(
                            condition.or(parent),
                            &[&fragment.node.selection_set],
                            false,
                        )?;
                    } else {
                        if !visited.insert(name) {
                            continue;
                        }
                        self.flatten_into(
                            condition.or(parent),
                            &fragment.node.selection_set,
                            false,
                            groups,
                            visited,
                        )?;
                    }
                }
                Selection::InlineFragment(inline) => {
                    let condition = self.condition_type(
                        inline
                            .node
                            .type_condition
                            .as_ref()
                            .map(|condition| &condition.node.on.node),
                    );
                    let deferred = !serial_root
                        && directives::defer_directive(
                            self.registry,
                            self.variables,
                            &inline.node.directives,
                        )?
                        .is_some();
                    if deferred {
                        self.check_scope(condition.or(parent), &[&inline.node.selection_set], false)?;
                    } else {
                        self.flatten_into(
                            condition.or(parent),
                            &inline.node.selection_set,
                            false,
                            groups,
                            visited,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn condition_type(&self, condition: Option<&Name>) -> Option<&'a MetaType> {
        condition.and_then(|name| self.registry.lookup_type(name.as_str()))
    }

    fn check_directives(
        &self,
        directives: &[Positioned<Directive>],
        location: DirectiveLocation,
    ) -> ServerResult<()> {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            let Some(definition) = self.registry.directive(name) else {
                return Err(ServerError::new(
                    format!("Unknown directive \"@{name}\"."),
                    Some(directive.pos),
                ));
            };
            if !definition.locations.contains(&location) {
                return Err(ServerError::new(
                    format!("Directive \"{name}\" may not be used on \"{location}\""),
                    Some(directive.pos),
                ));
            }
        }
        Ok(())
    }

    fn check_group(&self, response_key: &str, entries: &[GroupEntry<'a>]) -> ServerResult<()> {
        if entries.len() < 2 {
            return Ok(());
        }

        let locations: Vec<Pos> = entries.iter().map(|entry| entry.field.pos).collect();
        let first_name = entries[0].field.node.name.node.as_str();
        if let Some(other) = entries
            .iter()
            .find(|entry| entry.field.node.name.node != first_name)
        {
            return Err(ServerError::new_with_locations(
                format!(
                    "Fields \"{response_key}\" conflict because \"{first_name}\" and \"{}\" are \
                     different fields. Use different aliases on the fields to fetch both if this \
                     was intentional.",
                    other.field.node.name.node
                ),
                locations,
            ));
        }

        let any_streamed = entries.iter().any(|entry| entry.stream.is_some());
        if any_streamed
            && entries
                .iter()
                .any(|entry| entry.stream != entries[0].stream)
        {
            return Err(ServerError::new_with_locations(
                format!(
                    "Fields \"{first_name}\" conflict because they have differing stream \
                     directives. Use different aliases on the fields to fetch both if this was \
                     intentional."
                ),
                locations,
            ));
        }
        Ok(())
    }
}
