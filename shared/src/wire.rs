use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::detection::{DetectionResult, DetectionSummary};
use crate::timing::TimingBreakdown;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    /// Base64-encoded image bytes (any format the function can decode).
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_threshold: Option<f32>,
}

impl DetectionRequest {
    pub fn new(image: String) -> Self {
        Self {
            image,
            conf_threshold: None,
            iou_threshold: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBody {
    #[serde(rename = "annotatedImage")]
    pub annotated_image: String,
    pub detections: Vec<DetectionResult>,
    pub summary: DetectionSummary,
    pub timings: TimingBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_time_ms: Option<f64>,
}

/// Stable machine-readable error tags carried in `body.type`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ErrorKind {
    DecodeError,
    InvalidRequest,
    InferenceError,
    EncodeError,
    InternalError,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::DecodeError | ErrorKind::InvalidRequest => 400,
            ErrorKind::InferenceError | ErrorKind::EncodeError | ErrorKind::InternalError => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Kept as a string: older deployments report arbitrary exception names.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind: kind.to_string(),
        }
    }

    pub fn known_kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_str(&self.kind).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<B> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Detection(Box<DetectionBody>),
    Error(ErrorBody),
}

pub type DetectionResponse = Envelope<ResponseBody>;

impl DetectionResponse {
    pub fn success(body: DetectionBody) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Detection(Box::new(body)),
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status_code: kind.status_code(),
            body: ResponseBody::Error(ErrorBody::new(kind, message)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("malformed response payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("function returned status {status} ({kind}): {message}")]
    Remote {
        status: u16,
        kind: String,
        message: String,
    },
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "statusCode", default = "missing_status")]
    status_code: u16,
    #[serde(default)]
    body: Value,
}

fn missing_status() -> u16 {
    500
}

/// Decodes a raw invocation payload into the success body.
///
/// `body` may be an object or a JSON string holding the object. Any status
/// other than 200 becomes [`ResponseError::Remote`].
pub fn decode_response(payload: &[u8]) -> Result<DetectionBody, ResponseError> {
    let envelope: RawEnvelope = serde_json::from_slice(payload)?;
    let body = match envelope.body {
        Value::String(text) => serde_json::from_str(&text)?,
        other => other,
    };

    if envelope.status_code != 200 {
        let (kind, message) = match serde_json::from_value::<ErrorBody>(body.clone()) {
            Ok(err) => (err.kind, err.error),
            Err(_) => ("Unknown".to_string(), body.to_string()),
        };
        return Err(ResponseError::Remote {
            status: envelope.status_code,
            kind,
            message,
        });
    }

    Ok(serde_json::from_value(body)?)
}
