use shared::ErrorKind;

use crate::config::ConfigError;
use crate::detector::DetectorError;
use crate::runtime::RuntimeError;
use crate::timing::TimingError;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("request is missing the 'image' parameter")]
    MissingImage,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid thresholds: {0}")]
    Thresholds(#[from] ConfigError),
    #[error("image is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image payload is empty")]
    EmptyImage,
    #[error("image bytes could not be decoded: {0}")]
    UnreadableImage(#[source] image::ImageError),
    #[error("detection failed: {0}")]
    Detector(#[from] DetectorError),
    #[error("failed to encode annotated image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("timing instrumentation error: {0}")]
    Timing(#[from] TimingError),
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::MissingImage
            | HandlerError::InvalidRequest(_)
            | HandlerError::Thresholds(_) => ErrorKind::InvalidRequest,
            HandlerError::Base64(_) | HandlerError::EmptyImage | HandlerError::UnreadableImage(_) => {
                ErrorKind::DecodeError
            }
            HandlerError::Detector(_) => ErrorKind::InferenceError,
            HandlerError::Encode(_) => ErrorKind::EncodeError,
            HandlerError::Timing(_) => ErrorKind::InternalError,
        }
    }

    /// Message placed in `body.error`. Instrumentation faults stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            HandlerError::Timing(_) => "internal error while handling the request".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("runtime API error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
