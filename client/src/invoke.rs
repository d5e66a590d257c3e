//! Single request path shared by both tools.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::debug;
use shared::wire::decode_response;
use shared::{DetectionBody, DetectionRequest};
use tokio::time::Instant;

use crate::error::ClientError;
use crate::overhead::{Overhead, other_overhead};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub round_trip_ms: f64,
    pub overhead: Overhead,
    pub body: DetectionBody,
}

pub struct Invoker<T> {
    transport: T,
}

impl<T: Transport> Invoker<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` and decodes the answer. Only the transport call is
    /// inside the round-trip measurement.
    pub async fn invoke(&self, request: &DetectionRequest) -> Result<InvocationOutcome, ClientError> {
        let started = Instant::now();
        let payload = self.transport.invoke(request).await?;
        let round_trip_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "{} answered in {:.2} ms",
            self.transport.describe(),
            round_trip_ms
        );

        let body = decode_response(&payload)?;
        let overhead = other_overhead(round_trip_ms, body.timings.total_ms);
        Ok(InvocationOutcome {
            round_trip_ms,
            overhead,
            body,
        })
    }
}

pub fn encode_image_file(path: &Path) -> Result<String, ClientError> {
    let bytes = std::fs::read(path).map_err(|source| ClientError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", bytes.len(), path.display());
    Ok(STANDARD.encode(bytes))
}

pub fn save_annotated_image(annotated_image: &str, path: &Path) -> Result<(), ClientError> {
    let bytes = STANDARD.decode(annotated_image.trim())?;
    std::fs::write(path, bytes).map_err(|source| ClientError::SaveResult {
        path: path.to_path_buf(),
        source,
    })
}
