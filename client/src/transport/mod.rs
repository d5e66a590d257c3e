//! How a [`DetectionRequest`] reaches the function.
//!
//! Transports only move bytes; decoding the envelope is the invoker's job.

mod http;
mod lambda;

pub use http::HttpTransport;
pub use lambda::LambdaTransport;

use shared::DetectionRequest;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("lambda invoke failed: {0}")]
    Lambda(String),
    #[error("function raised an unhandled {kind}: {payload}")]
    FunctionError { kind: String, payload: String },
    #[error("invocation returned no payload")]
    EmptyPayload,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Short target description for logs and reports.
    fn describe(&self) -> String;

    /// Sends one request and returns the raw response payload.
    async fn invoke(&self, request: &DetectionRequest) -> Result<Vec<u8>, TransportError>;
}

pub enum AnyTransport {
    Lambda(LambdaTransport),
    Http(HttpTransport),
}

impl Transport for AnyTransport {
    fn describe(&self) -> String {
        match self {
            AnyTransport::Lambda(t) => t.describe(),
            AnyTransport::Http(t) => t.describe(),
        }
    }

    async fn invoke(&self, request: &DetectionRequest) -> Result<Vec<u8>, TransportError> {
        match self {
            AnyTransport::Lambda(t) => t.invoke(request).await,
            AnyTransport::Http(t) => t.invoke(request).await,
        }
    }
}
