//! The payloads of a streaming (incremental delivery) response.

use async_graphql_value::ConstValue;

use crate::{query_path::QueryPath, ServerError};

/// If a caller makes a streaming request, this is the set of payloads they
/// can receive. The first payload is always an `InitialResponse`, followed by
/// zero or more `Incremental` payloads; whenever the initial payload
/// announced more (`hasNext: true`), the sequence ends with a bare
/// `Completion` payload carrying `hasNext: false`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum StreamingPayload {
    Incremental(IncrementalPayload),
    InitialResponse(InitialResponse),
    Completion(CompletionPayload),
}

/// The initial streaming response: a standard response plus the `hasNext`
/// key.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConstValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,

    /// Whether the client should expect more payloads.
    pub has_next: bool,
}

/// An incremental payload as described in the [stream & defer RFC][1]: a
/// fragment of data plus the response path it grafts into.
///
/// [1]: https://github.com/graphql/graphql-wg/blob/main/rfcs/DeferStream.md#payload-format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalPayload {
    pub data: ConstValue,

    pub path: QueryPath,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,

    pub has_next: bool,
}

/// The distinct terminator of a streaming response: `{"hasNext": false}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPayload {
    pub has_next: bool,
}

impl From<IncrementalPayload> for StreamingPayload {
    fn from(val: IncrementalPayload) -> Self {
        StreamingPayload::Incremental(val)
    }
}

impl StreamingPayload {
    pub(crate) fn completion() -> Self {
        StreamingPayload::Completion(CompletionPayload { has_next: false })
    }
}
