//! Minimal Lambda custom runtime: poll for an event, handle it, post the result.
//!
//! Invocations are processed strictly one at a time.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use crate::detector::Detector;
use crate::handler::DetectionHandler;

const RUNTIME_API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("runtime API returned {status} for {endpoint}")]
    Status { endpoint: String, status: StatusCode },
    #[error("runtime API response is missing header {0}")]
    MissingHeader(&'static str),
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub payload: Vec<u8>,
}

#[derive(Clone)]
pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `runtime_api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(runtime_api: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}/{}/runtime", runtime_api, RUNTIME_API_VERSION),
        }
    }

    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let url = format!("{}/invocation/next", self.base_url);
        let response = self.http.get(&url).send().await?;
        check_status(&url, response.status())?;

        let headers = response.headers();
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(RuntimeError::MissingHeader(REQUEST_ID_HEADER))?
            .to_string();
        let deadline = headers
            .get(DEADLINE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);
        let payload = response.bytes().await?.to_vec();

        Ok(Invocation {
            request_id,
            deadline,
            payload,
        })
    }

    pub async fn post_response<T: Serialize>(
        &self,
        request_id: &str,
        response: &T,
    ) -> Result<(), RuntimeError> {
        let url = format!("{}/invocation/{}/response", self.base_url, request_id);
        let status = self.http.post(&url).json(response).send().await?.status();
        check_status(&url, status)
    }

    pub async fn post_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeError> {
        let url = format!("{}/invocation/{}/error", self.base_url, request_id);
        self.post_failure(&url, error_type, message).await
    }

    pub async fn post_init_error(&self, error_type: &str, message: &str) -> Result<(), RuntimeError> {
        let url = format!("{}/init/error", self.base_url);
        self.post_failure(&url, error_type, message).await
    }

    async fn post_failure(
        &self,
        url: &str,
        error_type: &str,
        message: &str,
    ) -> Result<(), RuntimeError> {
        let status = self
            .http
            .post(url)
            .header(ERROR_TYPE_HEADER, "Unhandled")
            .json(&json!({ "errorMessage": message, "errorType": error_type }))
            .send()
            .await?
            .status();
        check_status(url, status)
    }
}

fn check_status(endpoint: &str, status: StatusCode) -> Result<(), RuntimeError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RuntimeError::Status {
            endpoint: endpoint.to_string(),
            status,
        })
    }
}

/// Fetches, handles and answers a single invocation.
pub async fn serve_next<D: Detector>(
    client: &RuntimeClient,
    handler: &DetectionHandler<D>,
) -> Result<(), RuntimeError> {
    let invocation = client.next_invocation().await?;
    match invocation.deadline {
        Some(deadline) => log::info!(
            "invocation {} received, {} ms until deadline",
            invocation.request_id,
            (deadline - Utc::now()).num_milliseconds()
        ),
        None => log::info!("invocation {} received", invocation.request_id),
    }

    let event: Value = match serde_json::from_slice(&invocation.payload) {
        Ok(event) => event,
        Err(e) => {
            log::error!("invocation {} has a non-JSON payload: {}", invocation.request_id, e);
            return client
                .post_error(&invocation.request_id, "InvalidEvent", &e.to_string())
                .await;
        }
    };

    let response = handler.handle(event);
    client.post_response(&invocation.request_id, &response).await?;
    log::info!(
        "invocation {} answered with status {}",
        invocation.request_id,
        response.status_code
    );
    Ok(())
}

/// Runs until the runtime API fails; the detector stays loaded between events.
pub async fn run<D: Detector>(
    client: &RuntimeClient,
    handler: &DetectionHandler<D>,
) -> Result<(), RuntimeError> {
    log::info!("lambda runtime loop started at {}", client.base_url);
    loop {
        serve_next(client, handler).await?;
    }
}
