//! String wrappers for the GraphQL type syntax (`[Friend!]!` etc.) used by
//! field and input definitions.

use super::MetaTypeName;

/// Defines basic string conversion functionality for a string wrapper.
macro_rules! def_string_conversions {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> $ty {
                $ty(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> $ty {
                $ty(value)
            }
        }
    };
}

/// The type of a field, with any wrapping (list/non-null) intact.
#[derive(Clone, Default, Hash, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetaFieldType(String);

def_string_conversions!(MetaFieldType);

impl MetaFieldType {
    pub fn is_non_null(&self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_non_null()
    }

    pub fn is_list(&self) -> bool {
        MetaTypeName::create(&self.0).is_list()
    }

    /// The name of the type with all wrapping stripped.
    pub fn named_type(&self) -> &str {
        MetaTypeName::concrete_typename(&self.0)
    }

    /// The type of one element of this list type, with the list's own
    /// wrapping removed. `None` when this is not a list.
    pub fn list_item_type(&self) -> Option<MetaFieldType> {
        let inner = match MetaTypeName::create(&self.0).unwrap_non_null() {
            MetaTypeName::List(inner) => inner,
            _ => return None,
        };
        Some(MetaFieldType(inner.to_string()))
    }

    pub fn wrapping_types(&self) -> WrappingTypeIter<'_> {
        WrappingTypeIter(&self.0)
    }
}

/// The type of an input value or argument, with any wrapping intact.
#[derive(Clone, Default, Hash, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputValueType(String);

def_string_conversions!(InputValueType);

impl InputValueType {
    pub fn is_non_null(&self) -> bool {
        self.0.ends_with('!')
    }

    pub fn named_type(&self) -> &str {
        MetaTypeName::concrete_typename(&self.0)
    }
}

/// One layer of wrapping on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrappingType {
    NonNull,
    List,
}

/// Iterates the wrapping of a type string from the outside in:
/// `[String!]!` yields `NonNull`, `List`, `NonNull`.
pub struct WrappingTypeIter<'a>(&'a str);

impl Iterator for WrappingTypeIter<'_> {
    type Item = WrappingType;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(rest) = self.0.strip_suffix('!') {
            self.0 = rest;
            return Some(WrappingType::NonNull);
        }
        if self.0.starts_with('[') && self.0.ends_with(']') {
            self.0 = &self.0[1..self.0.len() - 1];
            return Some(WrappingType::List);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrappings(ty: &str) -> Vec<WrappingType> {
        MetaFieldType::from(ty).wrapping_types().collect()
    }

    #[test]
    fn wrapping_type_iter() {
        use WrappingType::{List, NonNull};

        assert_eq!(wrappings("String"), vec![]);
        assert_eq!(wrappings("String!"), vec![NonNull]);
        assert_eq!(wrappings("[String!]"), vec![List, NonNull]);
        assert_eq!(wrappings("[String!]!"), vec![NonNull, List, NonNull]);
        assert_eq!(
            wrappings("[[String]!]!"),
            vec![NonNull, List, NonNull, List]
        );
    }

    #[test]
    fn named_type_strips_all_wrapping() {
        assert_eq!(MetaFieldType::from("[[Friend!]]!").named_type(), "Friend");
        assert_eq!(MetaFieldType::from("Friend").named_type(), "Friend");
    }

    #[test]
    fn list_item_type() {
        assert_eq!(
            MetaFieldType::from("[Friend!]!").list_item_type(),
            Some(MetaFieldType::from("Friend!"))
        );
        assert_eq!(
            MetaFieldType::from("[[Int]]").list_item_type(),
            Some(MetaFieldType::from("[Int]"))
        );
        assert_eq!(MetaFieldType::from("Friend!").list_item_type(), None);
    }
}
