use async_graphql_value::ConstValue;

use crate::{
    streaming::{InitialResponse, StreamingPayload},
    ServerError,
};

/// A single, complete GraphQL response.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Response {
    /// The response data. `None` when the request failed before execution
    /// started; `Some(Null)` when a non-null root field errored out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConstValue>,

    /// The errors raised while producing `data`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl Response {
    pub fn new(data: ConstValue) -> Self {
        Response {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// A response for a request that failed before execution started: no
    /// `data` at all, only errors.
    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Response { data: None, errors }
    }

    pub fn from_server_error(error: ServerError) -> Self {
        Self::from_errors(vec![error])
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn this response into the first payload of a streaming response.
    pub fn into_streaming_payload(self, has_next: bool) -> StreamingPayload {
        StreamingPayload::InitialResponse(InitialResponse {
            data: self.data,
            errors: self.errors,
            has_next,
        })
    }
}
