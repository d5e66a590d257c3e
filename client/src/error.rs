use std::path::PathBuf;

use shared::wire::ResponseError;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("annotated image is not valid base64: {0}")]
    InvalidAnnotatedImage(#[from] base64::DecodeError),
    #[error("failed to save annotated image to {path}: {source}")]
    SaveResult {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Machine-readable tag shown next to the message.
    ///
    /// Remote failures keep the function's own `body.type`.
    pub fn kind(&self) -> &str {
        match self {
            ClientError::ImageRead { .. } => "ImageReadError",
            ClientError::Transport(_) => "TransportError",
            ClientError::Response(ResponseError::Remote { kind, .. }) => kind,
            ClientError::Response(ResponseError::Malformed(_)) => "MalformedResponse",
            ClientError::InvalidAnnotatedImage(_) => "DecodeError",
            ClientError::SaveResult { .. } => "SaveError",
        }
    }

    /// The human-readable part, without the tag.
    pub fn message(&self) -> String {
        match self {
            ClientError::Response(ResponseError::Remote { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }
}
