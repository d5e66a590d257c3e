//! Arguments shared by both command-line tools.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use shared::DetectionRequest;

use crate::error::ClientError;
use crate::invoke::encode_image_file;
use crate::transport::{AnyTransport, HttpTransport, LambdaTransport, TransportError};

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Image file to send
    #[arg(short, long, value_name = "PATH")]
    pub image: PathBuf,

    /// Where to write the annotated image returned by the function
    #[arg(short, long, value_name = "PATH")]
    pub save_result: Option<PathBuf>,

    /// Lambda function name
    #[arg(short, long, env = "DETECT_FUNCTION_NAME", default_value = "yolo-sample")]
    pub function_name: String,

    /// AWS region of the function
    #[arg(short, long, env = "AWS_REGION", default_value = "ap-northeast-1")]
    pub region: String,

    /// POST to this URL instead of invoking Lambda (e.g. http://localhost:8080/invoke)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Per-request timeout
    #[arg(long, default_value_t = 120, value_name = "SECS")]
    pub timeout_secs: u64,

    /// Override the function's confidence threshold
    #[arg(long, value_name = "0..1")]
    pub conf_threshold: Option<f32>,

    /// Override the function's NMS IoU threshold
    #[arg(long, value_name = "0..1")]
    pub iou_threshold: Option<f32>,
}

impl TargetArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads and encodes the image into a request.
    pub fn request(&self) -> Result<DetectionRequest, ClientError> {
        Ok(DetectionRequest {
            image: encode_image_file(&self.image)?,
            conf_threshold: self.conf_threshold,
            iou_threshold: self.iou_threshold,
        })
    }

    pub async fn connect(&self) -> Result<AnyTransport, TransportError> {
        match &self.endpoint {
            Some(url) => Ok(AnyTransport::Http(HttpTransport::new(url, self.timeout())?)),
            None => Ok(AnyTransport::Lambda(
                LambdaTransport::connect(&self.function_name, &self.region, self.timeout()).await,
            )),
        }
    }
}
