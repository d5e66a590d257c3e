use std::time::Duration;

use log::debug;
use shared::DetectionRequest;

use super::{Transport, TransportError};

/// Posts the request as JSON, e.g. to the function's local `/invoke` route.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn describe(&self) -> String {
        format!("endpoint {}", self.endpoint)
    }

    async fn invoke(&self, request: &DetectionRequest) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let payload = response.bytes().await?;
        debug!("{} answered with {} bytes", self.endpoint, payload.len());
        Ok(payload.to_vec())
    }
}
