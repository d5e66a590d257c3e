use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::config::Region;
use aws_sdk_lambda::config::timeout::TimeoutConfig;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use log::{debug, info};
use shared::DetectionRequest;

use super::{Transport, TransportError};

/// Synchronous (`RequestResponse`) Lambda invocation through the AWS SDK.
pub struct LambdaTransport {
    client: Client,
    function_name: String,
    region: String,
}

impl LambdaTransport {
    pub async fn connect(function_name: &str, region: &str, timeout: Duration) -> Self {
        info!("Initializing Lambda client for {} in {}", function_name, region);
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;

        Self {
            client: Client::new(&config),
            function_name: function_name.to_string(),
            region: region.to_string(),
        }
    }
}

impl Transport for LambdaTransport {
    fn describe(&self) -> String {
        format!("lambda function {} ({})", self.function_name, self.region)
    }

    async fn invoke(&self, request: &DetectionRequest) -> Result<Vec<u8>, TransportError> {
        let payload = serde_json::to_vec(request)?;
        debug!("Invoking {} with {} byte payload", self.function_name, payload.len());

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| TransportError::Lambda(DisplayErrorContext(&e).to_string()))?;

        let payload = output
            .payload()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or(TransportError::EmptyPayload)?;
        debug!(
            "Lambda answered with status {} and {} byte payload",
            output.status_code(),
            payload.len()
        );

        // Set when the function crashed instead of returning an envelope.
        if let Some(kind) = output.function_error() {
            return Err(TransportError::FunctionError {
                kind: kind.to_string(),
                payload: String::from_utf8_lossy(&payload).into_owned(),
            });
        }
        Ok(payload)
    }
}
