use std::sync::Arc;

use serde_json::Value;

use crate::query_path::QueryPathSegment;

/// The JSON data passed between resolvers.
///
/// Cheap to clone and to take sub-copies of: the root blob is shared and a
/// sub-value is just the root plus a path into it.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    /// The root of the JSON blob that contains this value. The shape of the
    /// data is whatever the resolver that produced it returned.
    data_root: Arc<Value>,
    /// The path to this value inside `data_root`, so a sub-copy never clones
    /// the whole blob.
    data_path: Vec<QueryPathSegment>,
}

impl ResolvedValue {
    pub fn new(value: Value) -> Self {
        Self {
            data_root: Arc::new(value),
            data_path: vec![],
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn data_resolved(&self) -> &Value {
        self.data_path
            .iter()
            .fold(self.data_root.as_ref(), |value, index| {
                match index {
                    QueryPathSegment::Field(field) => value.get(field.as_str()),
                    QueryPathSegment::Index(index) => value.get(*index),
                }
                .expect("data_path to be validated before ResolvedValue construction")
            })
    }

    pub fn is_null(&self) -> bool {
        self.data_resolved().is_null()
    }

    /// Returns a new value pointing at the given index, assuming this is a
    /// list and the index exists.
    pub fn get_index(&self, index: usize) -> Option<ResolvedValue> {
        self.data_resolved().get(index)?;

        let mut data_path = self.data_path.clone();
        data_path.push(QueryPathSegment::Index(index));

        Some(ResolvedValue {
            data_root: Arc::clone(&self.data_root),
            data_path,
        })
    }

    /// Returns a new value pointing at the given field, assuming this is an
    /// object and the field exists.
    pub fn get_field(&self, name: &str) -> Option<ResolvedValue> {
        self.data_resolved().get(name)?;

        let mut data_path = self.data_path.clone();
        data_path.push(QueryPathSegment::Field(name.to_string()));

        Some(ResolvedValue {
            data_root: Arc::clone(&self.data_root),
            data_path,
        })
    }

    /// Takes the inner value.
    ///
    /// Avoids cloning when we are the sole owner of the root blob.
    pub fn take(mut self) -> Value {
        match Arc::try_unwrap(self.data_root) {
            Ok(value) => self
                .data_path
                .iter()
                .fold(value, |mut value, index| match index {
                    QueryPathSegment::Field(field) => value
                        .get_mut(field.as_str())
                        .expect("data_path to be validated")
                        .take(),
                    QueryPathSegment::Index(index) => value
                        .get_mut(*index)
                        .expect("data_path to be validated")
                        .take(),
                }),
            Err(arc) => {
                self.data_root = arc;
                self.data_resolved().clone()
            }
        }
    }

    /// If this value is an array, an iterator over its items.
    pub fn item_iter(&self) -> Option<impl Iterator<Item = ResolvedValue> + '_> {
        match self.data_resolved() {
            Value::Array(array) => Some((0..array.len()).map(|index| {
                let mut data_path = self.data_path.clone();
                data_path.push(QueryPathSegment::Index(index));

                ResolvedValue {
                    data_root: Arc::clone(&self.data_root),
                    data_path,
                }
            })),
            _ => None,
        }
    }
}

impl Default for ResolvedValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resolved_value_array() {
        let data = ResolvedValue::new(json!(["hello", "there"]));
        assert_eq!(data.get_index(0).unwrap().data_resolved(), &json!("hello"));
        assert_eq!(data.get_index(1).unwrap().data_resolved(), &json!("there"));
        assert!(data.get_index(2).is_none());

        assert!(data.get_field("1").is_none());

        assert_eq!(data.get_index(0).unwrap().take(), json!("hello"));

        assert_eq!(
            data.item_iter()
                .unwrap()
                .map(ResolvedValue::take)
                .collect::<Vec<_>>(),
            vec![json!("hello"), json!("there")]
        );
    }

    #[test]
    fn test_resolved_value_object() {
        let data = ResolvedValue::new(json!({"a": "hello", "b": "there"}));
        assert_eq!(data.get_field("a").unwrap().data_resolved(), &json!("hello"));
        assert_eq!(data.get_field("b").unwrap().data_resolved(), &json!("there"));
        assert!(data.get_field("c").is_none());

        assert!(data.get_index(1).is_none());

        assert_eq!(data.get_field("a").unwrap().take(), json!("hello"));
    }

    #[test]
    fn test_resolved_value_scalar() {
        let data = ResolvedValue::new(json!(true));

        assert!(data.get_index(0).is_none());
        assert!(data.get_field("hello").is_none());

        assert_eq!(data.data_resolved(), &json!(true));
        assert_eq!(data.take(), json!(true));
    }
}
