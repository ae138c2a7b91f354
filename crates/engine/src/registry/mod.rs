//! The runtime type registry the executor resolves against.

pub mod input_resolution;
pub mod resolved_value;
pub mod resolvers;
pub mod scalars;
mod type_names;

use std::collections::{BTreeMap, HashMap, HashSet};

use async_graphql_value::ConstValue;
use indexmap::{IndexMap, IndexSet};

pub use type_names::{InputValueType, MetaFieldType, WrappingType, WrappingTypeIter};

use self::resolvers::Resolver;

fn strip_brackets(type_name: &str) -> Option<&str> {
    type_name
        .strip_prefix('[')
        .map(|rest| &rest[..rest.len() - 1])
}

/// One level of a type string, used to recurse through wrapping during
/// coercion and completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetaTypeName<'a> {
    List(&'a str),
    NonNull(&'a str),
    Named(&'a str),
}

impl std::fmt::Display for MetaTypeName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaTypeName::Named(name) => write!(f, "{name}"),
            MetaTypeName::NonNull(name) => write!(f, "{name}!"),
            MetaTypeName::List(name) => write!(f, "[{name}]"),
        }
    }
}

impl<'a> MetaTypeName<'a> {
    #[inline]
    pub fn create(type_name: &str) -> MetaTypeName<'_> {
        if let Some(type_name) = type_name.strip_suffix('!') {
            MetaTypeName::NonNull(type_name)
        } else if let Some(type_name) = strip_brackets(type_name) {
            MetaTypeName::List(type_name)
        } else {
            MetaTypeName::Named(type_name)
        }
    }

    #[inline]
    pub fn concrete_typename(type_name: &str) -> &str {
        match MetaTypeName::create(type_name) {
            MetaTypeName::List(type_name) | MetaTypeName::NonNull(type_name) => {
                Self::concrete_typename(type_name)
            }
            MetaTypeName::Named(type_name) => type_name,
        }
    }

    #[inline]
    pub fn is_non_null(&self) -> bool {
        matches!(self, MetaTypeName::NonNull(_))
    }

    #[inline]
    #[must_use]
    pub fn unwrap_non_null(&self) -> Self {
        match self {
            MetaTypeName::NonNull(ty) => MetaTypeName::create(ty),
            _ => *self,
        }
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        match self {
            MetaTypeName::List(_) => true,
            MetaTypeName::NonNull(ty) => MetaTypeName::create(ty).is_list(),
            MetaTypeName::Named(name) => name.ends_with(']'),
        }
    }
}

/// An input value definition: a field argument, a directive argument or an
/// input object field.
#[derive(Clone, Default, Debug)]
pub struct MetaInputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: InputValueType,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<InputValueType>) -> MetaInputValue {
        MetaInputValue {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> MetaInputValue {
        MetaInputValue {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_default(self, default: ConstValue) -> MetaInputValue {
        MetaInputValue {
            default_value: Some(default),
            ..self
        }
    }
}

/// A field of an object or interface type.
#[derive(Clone, Default, Debug)]
pub struct MetaField {
    pub name: String,
    /// The property of the parent value the default resolver reads; defaults
    /// to the field name.
    pub mapped_name: Option<String>,
    pub description: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    pub ty: MetaFieldType,
    pub resolver: Resolver,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaField {
        MetaField {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    pub fn with_resolver(self, resolver: Resolver) -> Self {
        Self { resolver, ..self }
    }

    pub fn with_argument(mut self, argument: MetaInputValue) -> Self {
        self.args.insert(argument.name.clone(), argument);
        self
    }

    pub fn target_field_name(&self) -> &str {
        self.mapped_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub specified_by_url: Option<String>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        ScalarType {
            name: name.into(),
            description: None,
            specified_by_url: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> ObjectType {
        ObjectType {
            name: name.into(),
            description: None,
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
        }
    }

    pub fn with_description(self, description: impl Into<Option<String>>) -> Self {
        ObjectType {
            description: description.into(),
            ..self
        }
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    pub possible_types: IndexSet<String>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> Self {
        InterfaceType {
            name: name.into(),
            description: None,
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
            possible_types: Default::default(),
        }
    }

    pub fn with_possible_types<T: Into<String>>(
        mut self,
        types: impl IntoIterator<Item = T>,
    ) -> Self {
        self.possible_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub possible_types: IndexSet<String>,
}

impl UnionType {
    pub fn new<T: Into<String>>(
        name: impl Into<String>,
        possible_types: impl IntoIterator<Item = T>,
    ) -> UnionType {
        UnionType {
            name: name.into(),
            description: None,
            possible_types: possible_types.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetaEnumValue {
    pub name: String,
    pub description: Option<String>,
}

impl MetaEnumValue {
    pub fn new(name: impl Into<String>) -> Self {
        MetaEnumValue {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub enum_values: IndexMap<String, MetaEnumValue>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = MetaEnumValue>) -> Self {
        EnumType {
            name: name.into(),
            description: None,
            enum_values: values
                .into_iter()
                .map(|value| (value.name.clone(), value))
                .collect(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&MetaEnumValue> {
        self.enum_values.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub input_fields: IndexMap<String, MetaInputValue>,
}

impl InputObjectType {
    pub fn new(
        name: impl Into<String>,
        input_fields: impl IntoIterator<Item = MetaInputValue>,
    ) -> Self {
        InputObjectType {
            name: name.into(),
            description: None,
            input_fields: input_fields
                .into_iter()
                .map(|value| (value.name.clone(), value))
                .collect(),
        }
    }
}

/// A type registered in the schema.
#[derive(Clone, Debug)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(inner) => &inner.name,
            MetaType::Object(inner) => &inner.name,
            MetaType::Interface(inner) => &inner.name,
            MetaType::Union(inner) => &inner.name,
            MetaType::Enum(inner) => &inner.name,
            MetaType::InputObject(inner) => &inner.name,
        }
    }

    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            MetaType::Object(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface(_) | MetaType::Union(_))
    }

    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        match self {
            MetaType::Object(inner) => inner.field_by_name(name),
            MetaType::Interface(inner) => inner.field_by_name(name),
            _ => None,
        }
    }
}

macro_rules! meta_type_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for MetaType {
            fn from(val: $ty) -> Self {
                MetaType::$variant(val)
            }
        })*
    };
}

meta_type_from! {
    ScalarType => Scalar,
    ObjectType => Object,
    InterfaceType => Interface,
    UnionType => Union,
    EnumType => Enum,
    InputObjectType => InputObject,
}

/// Where a directive may legally appear in an executable document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveLocation {
    Field,
    FragmentSpread,
    InlineFragment,
}

impl std::fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DirectiveLocation::Field => "Field",
            DirectiveLocation::FragmentSpread => "FragmentSpread",
            DirectiveLocation::InlineFragment => "InlineFragment",
        })
    }
}

/// An executable directive definition.
#[derive(Clone, Debug)]
pub struct MetaDirective {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<DirectiveLocation>,
    pub args: IndexMap<String, MetaInputValue>,
}

/// All the types, directives and root names of one schema.
#[derive(Clone, Debug)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    pub directives: HashMap<String, MetaDirective>,
    pub implements: HashMap<String, HashSet<String>>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
}

impl Registry {
    /// An empty registry with the built-in scalars and directives registered.
    ///
    /// `@stream` is not part of the builtins: it is opted into per schema via
    /// [`Registry::enable_stream_directive`].
    pub fn new(query_type: impl Into<String>) -> Self {
        let mut registry = Registry {
            types: BTreeMap::new(),
            directives: HashMap::new(),
            implements: HashMap::new(),
            query_type: query_type.into(),
            mutation_type: None,
            subscription_type: None,
        };
        registry.add_builtins();
        registry
    }

    fn add_builtins(&mut self) {
        for builtin in ["Boolean", "Int", "Float", "String", "ID"] {
            self.types
                .insert(builtin.to_string(), ScalarType::new(builtin).into());
        }

        self.add_directive(MetaDirective {
            name: "include".to_string(),
            description: Some(
                "Directs the executor to include this field or fragment only when the `if` argument is true."
                    .to_string(),
            ),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            args: [MetaInputValue::new("if", "Boolean!").with_description("Included when true.")]
                .into_iter()
                .map(|arg| (arg.name.clone(), arg))
                .collect(),
        });

        self.add_directive(MetaDirective {
            name: "skip".to_string(),
            description: Some(
                "Directs the executor to skip this field or fragment when the `if` argument is true."
                    .to_string(),
            ),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            args: [MetaInputValue::new("if", "Boolean!").with_description("Skipped when true.")]
                .into_iter()
                .map(|arg| (arg.name.clone(), arg))
                .collect(),
        });

        self.add_directive(MetaDirective {
            name: "defer".to_string(),
            description: Some(
                "De-prioritizes a fragment, causing the fragment to be omitted in the initial response and delivered as a subsequent response afterward."
                    .to_string(),
            ),
            locations: vec![
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            args: [
                MetaInputValue::new("if", "Boolean!")
                    .with_description("When true fragment may be deferred")
                    .with_default(ConstValue::Boolean(true)),
                MetaInputValue::new("label", "String").with_description(
                    "This label should be used by GraphQL clients to identify the data from patch responses and associate it with the correct fragment.",
                ),
            ]
            .into_iter()
            .map(|arg| (arg.name.clone(), arg))
            .collect(),
        });
    }

    /// Register the `@stream` directive, allowing list fields to be delivered
    /// incrementally.
    pub fn enable_stream_directive(&mut self) {
        self.add_directive(MetaDirective {
            name: "stream".to_string(),
            description: Some(
                "De-prioritizes a list of items in a list field, causing them to be omitted in the initial response and delivered as subsequent responses afterward."
                    .to_string(),
            ),
            locations: vec![DirectiveLocation::Field],
            args: [
                MetaInputValue::new("if", "Boolean!")
                    .with_description("When true items may be streamed")
                    .with_default(ConstValue::Boolean(true)),
                MetaInputValue::new("label", "String").with_description(
                    "This label should be used by GraphQL clients to identify the data from patch responses and associate it with the correct fragment.",
                ),
                MetaInputValue::new("initialCount", "Int!")
                    .with_description("The number of list items to deliver as part of the initial response")
                    .with_default(ConstValue::Number(0.into())),
            ]
            .into_iter()
            .map(|arg| (arg.name.clone(), arg))
            .collect(),
        });
    }

    pub fn add_directive(&mut self, directive: MetaDirective) {
        self.directives.insert(directive.name.clone(), directive);
    }

    pub fn directive(&self, name: &str) -> Option<&MetaDirective> {
        self.directives.get(name)
    }

    pub fn insert_type(&mut self, ty: impl Into<MetaType>) {
        let ty = ty.into();
        self.types.insert(ty.name().to_string(), ty);
    }

    pub fn add_implements(&mut self, ty: impl Into<String>, interface: impl Into<String>) {
        self.implements
            .entry(ty.into())
            .or_default()
            .insert(interface.into());
    }

    pub fn with_mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    pub fn with_subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// Look up the named type behind a (possibly wrapped) field type.
    pub fn lookup(&self, ty: &MetaFieldType) -> Option<&MetaType> {
        self.lookup_type(ty.named_type())
    }

    /// Whether `object_name` is a possible runtime type of the given abstract
    /// type.
    pub fn is_possible_type(&self, abstract_type: &MetaType, object_name: &str) -> bool {
        match abstract_type {
            MetaType::Interface(interface) => {
                interface.possible_types.contains(object_name)
                    || self
                        .implements
                        .get(object_name)
                        .is_some_and(|interfaces| interfaces.contains(&interface.name))
            }
            MetaType::Union(union) => union.possible_types.contains(object_name),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::new("Query");
        assert!(registry.lookup_type("Int").is_some());
        assert!(registry.directive("skip").is_some());
        assert!(registry.directive("include").is_some());
        assert!(registry.directive("defer").is_some());
        assert!(registry.directive("stream").is_none());
    }

    #[test]
    fn stream_directive_is_opt_in() {
        let mut registry = Registry::new("Query");
        registry.enable_stream_directive();
        let stream = registry.directive("stream").unwrap();
        assert_eq!(
            stream.args["initialCount"].default_value,
            Some(ConstValue::Number(0.into()))
        );
    }

    #[test]
    fn possible_types_through_implements() {
        let mut registry = Registry::new("Query");
        registry.insert_type(InterfaceType::new("Character", []));
        registry.insert_type(ObjectType::new("Droid", []));
        registry.add_implements("Droid", "Character");

        let character = registry.lookup_type("Character").unwrap().clone();
        assert!(registry.is_possible_type(&character, "Droid"));
        assert!(!registry.is_possible_type(&character, "Human"));
    }
}
