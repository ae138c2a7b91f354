use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use async_graphql_parser::Pos;
use async_graphql_value::ConstValue;

use crate::query_path::QueryPathSegment;

/// Alias for `Result<T, ServerError>`.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// An alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Extensions attached to an error, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ErrorExtensionValues(pub std::collections::BTreeMap<String, ConstValue>);

impl ErrorExtensionValues {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConstValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An error that can appear in the `errors` list of a response.
///
/// This is the wire representation: a message, the source locations of the
/// responsible selections and, for field errors, the response path of the
/// field that produced it.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerError {
    /// The error message.
    pub message: String,
    /// The source of the error, if any.
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    /// Where the error occurred in the query source.
    #[serde(with = "locations", skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Pos>,
    /// The response path of the field that raised the error, empty for
    /// request-level errors.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<QueryPathSegment>,
    /// Extensions to the error.
    #[serde(skip_serializing_if = "error_extensions_is_empty", default)]
    pub extensions: Option<ErrorExtensionValues>,
}

fn error_extensions_is_empty(values: &Option<ErrorExtensionValues>) -> bool {
    values.as_ref().map_or(true, ErrorExtensionValues::is_empty)
}

impl ServerError {
    /// Create a new server error with the message.
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            source: None,
            locations: pos.map(|pos| vec![pos]).unwrap_or_default(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Create a new server error pointing at several locations at once.
    pub fn new_with_locations(message: impl Into<String>, locations: Vec<Pos>) -> Self {
        Self {
            message: message.into(),
            source: None,
            locations,
            path: Vec::new(),
            extensions: None,
        }
    }
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerError")
            .field("message", &self.message)
            .field("locations", &self.locations)
            .field("path", &self.path)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl PartialEq for ServerError {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message)
            && self.locations.eq(&other.locations)
            && self.path.eq(&other.path)
            && self.extensions.eq(&other.extensions)
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

mod locations {
    use async_graphql_parser::Pos;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Location {
        line: usize,
        column: usize,
    }

    pub fn serialize<S: Serializer>(locations: &[Pos], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(locations.iter().map(|pos| Location {
            line: pos.line,
            column: pos.column,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Pos>, D::Error> {
        Ok(Vec::<Location>::deserialize(deserializer)?
            .into_iter()
            .map(|location| Pos {
                line: location.line,
                column: location.column,
            })
            .collect())
    }
}

/// An error with a message and optional extensions, raised by resolvers.
///
/// Unlike [`ServerError`] this carries no location: the position and the
/// response path are attached when the error crosses into the response.
#[derive(Clone, serde::Serialize)]
pub struct Error {
    /// The error message.
    pub message: String,
    /// The source of the error.
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    /// Extensions to the error.
    #[serde(skip_serializing_if = "error_extensions_is_empty")]
    pub extensions: Option<ErrorExtensionValues>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message) && self.extensions.eq(&other.extensions)
    }
}

impl Error {
    /// Create an error from the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            extensions: None,
        }
    }

    /// Create an error with a type that implements `Display`, and it will also
    /// set the `source` of the error to this value.
    pub fn new_with_source(source: impl Display + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
            extensions: None,
        }
    }

    /// Convert the error to a server error at the given position.
    #[must_use]
    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError {
            message: self.message,
            source: self.source,
            locations: vec![pos],
            path: Vec::new(),
            extensions: self.extensions,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(value.to_string())
    }
}

impl From<ServerError> for Error {
    fn from(value: ServerError) -> Self {
        Self {
            message: value.message,
            source: value.source,
            extensions: value.extensions,
        }
    }
}

/// An error raised while building a schema out of a registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The registry names a root type that does not exist.
    #[error("The {operation_type} root type \"{name}\" is not defined")]
    UnknownRootType {
        operation_type: &'static str,
        name: String,
    },

    /// The registry names a root type that is not an object.
    #[error("The {operation_type} root type \"{name}\" must be an object type")]
    InvalidRootType {
        operation_type: &'static str,
        name: String,
    },
}
