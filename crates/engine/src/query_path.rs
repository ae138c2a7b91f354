//! Response paths.
//!
//! Two representations exist: [`QueryPathNode`], a borrowed linked list that
//! costs O(1) per recursion step while fields and list items are resolved, and
//! [`QueryPath`], the owned flat form materialized whenever a path is actually
//! observed (an error, a deferred workload, a patch).

use std::fmt::{self, Display, Formatter};

/// A single segment of an owned response path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum QueryPathSegment {
    /// A list index.
    Index(usize),
    /// A field response key.
    Field(String),
}

impl Display for QueryPathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryPathSegment::Index(index) => write!(f, "{index}"),
            QueryPathSegment::Field(name) => f.write_str(name),
        }
    }
}

/// An owned response path, serialized as a flat list of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct QueryPath(Vec<QueryPathSegment>);

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: QueryPathSegment) {
        self.0.push(segment);
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<QueryPathSegment>) -> Self {
        let mut path = self.clone();
        path.push(segment.into());
        path
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryPathSegment> {
        self.0.iter()
    }
}

impl From<Vec<QueryPathSegment>> for QueryPath {
    fn from(segments: Vec<QueryPathSegment>) -> Self {
        QueryPath(segments)
    }
}

impl IntoIterator for QueryPath {
    type Item = QueryPathSegment;
    type IntoIter = std::vec::IntoIter<QueryPathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<usize> for QueryPathSegment {
    fn from(index: usize) -> Self {
        QueryPathSegment::Index(index)
    }
}

impl From<&str> for QueryPathSegment {
    fn from(name: &str) -> Self {
        QueryPathSegment::Field(name.to_string())
    }
}

impl Display for QueryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}

/// A borrowed segment of an in-flight response path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPathSegmentRef<'a> {
    /// A list index.
    Index(usize),
    /// A field response key, borrowed from the query source.
    Name(&'a str),
}

impl QueryPathSegmentRef<'_> {
    pub fn to_owned_segment(&self) -> QueryPathSegment {
        match self {
            QueryPathSegmentRef::Index(index) => QueryPathSegment::Index(*index),
            QueryPathSegmentRef::Name(name) => QueryPathSegment::Field((*name).to_string()),
        }
    }
}

/// One node of the linked response path threaded through resolution.
///
/// Nodes live on the stack of the resolution step that created them; the
/// chain is only walked (parents first) when a path is materialized.
#[derive(Debug, Clone, Copy)]
pub struct QueryPathNode<'a> {
    pub parent: Option<&'a QueryPathNode<'a>>,
    pub segment: QueryPathSegmentRef<'a>,
}

impl<'a> QueryPathNode<'a> {
    pub fn new(parent: Option<&'a QueryPathNode<'a>>, segment: QueryPathSegmentRef<'a>) -> Self {
        Self { parent, segment }
    }

    /// Visit every segment from the root down.
    pub fn for_each(&self, f: &mut impl FnMut(&QueryPathSegmentRef<'a>)) {
        if let Some(parent) = self.parent {
            parent.for_each(f);
        }
        f(&self.segment);
    }

    /// Flatten the chain into an owned path.
    pub fn to_query_path(&self) -> QueryPath {
        let mut segments = Vec::new();
        self.for_each(&mut |segment| segments.push(segment.to_owned_segment()));
        QueryPath(segments)
    }
}

/// Flatten a base path plus an in-flight chain into one owned path.
///
/// Deferred workloads execute with the workload's own registered path as the
/// base, so paths observed inside them stay absolute.
pub(crate) fn concat_path(base: &QueryPath, node: Option<&QueryPathNode<'_>>) -> QueryPath {
    let mut segments = base.0.clone();
    if let Some(node) = node {
        node.for_each(&mut |segment| segments.push(segment.to_owned_segment()));
    }
    QueryPath(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattening_walks_parents_first() {
        let root = QueryPathNode::new(None, QueryPathSegmentRef::Name("hero"));
        let friends = QueryPathNode::new(Some(&root), QueryPathSegmentRef::Name("friends"));
        let second = QueryPathNode::new(Some(&friends), QueryPathSegmentRef::Index(1));

        assert_eq!(
            second.to_query_path(),
            QueryPath(vec![
                QueryPathSegment::Field("hero".into()),
                QueryPathSegment::Field("friends".into()),
                QueryPathSegment::Index(1),
            ])
        );
        assert_eq!(second.to_query_path().to_string(), "hero.friends.1");
    }

    #[test]
    fn concat_prepends_the_base() {
        let base = QueryPath(vec![QueryPathSegment::Field("hero".into())]);
        let node = QueryPathNode::new(None, QueryPathSegmentRef::Index(2));
        assert_eq!(
            concat_path(&base, Some(&node)),
            QueryPath(vec![
                QueryPathSegment::Field("hero".into()),
                QueryPathSegment::Index(2)
            ])
        );
        assert_eq!(concat_path(&base, None), base);
    }

    #[test]
    fn segments_serialize_untagged() {
        let path = QueryPath(vec![
            QueryPathSegment::Field("friends".into()),
            QueryPathSegment::Index(0),
        ]);
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!(["friends", 0])
        );
    }
}
