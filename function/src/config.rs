use std::str::FromStr;

pub const DEFAULT_MODEL_NAME: &str = "yolov8n.torchscript";
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} must be within [0, 1], got {value}")]
    OutOfRange { key: &'static str, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confidence: f32,
    pub iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONF_THRESHOLD,
            iou: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Applies per-request overrides on top of the configured values.
    pub fn resolve(
        self,
        confidence: Option<f32>,
        iou: Option<f32>,
    ) -> Result<Thresholds, ConfigError> {
        let resolved = Thresholds {
            confidence: confidence.unwrap_or(self.confidence),
            iou: iou.unwrap_or(self.iou),
        };
        check_unit("conf_threshold", resolved.confidence)?;
        check_unit("iou_threshold", resolved.iou)?;
        Ok(resolved)
    }
}

/// Function settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionConfig {
    pub model_name: String,
    pub thresholds: Thresholds,
    /// Square model input side in pixels.
    pub image_size: u32,
    pub max_detections: usize,
    pub jpeg_quality: u8,
    pub port: u16,
    /// Set when running inside Lambda; selects the runtime loop over the local server.
    pub runtime_api: Option<String>,
}

impl FunctionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let thresholds = Thresholds {
            confidence: parse_or(&lookup, "CONF_THRESHOLD", DEFAULT_CONF_THRESHOLD)?,
            iou: parse_or(&lookup, "IOU_THRESHOLD", DEFAULT_IOU_THRESHOLD)?,
        };
        check_unit("CONF_THRESHOLD", thresholds.confidence)?;
        check_unit("IOU_THRESHOLD", thresholds.iou)?;

        let jpeg_quality: u8 = parse_or(&lookup, "JPEG_QUALITY", 85)?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError::Invalid {
                key: "JPEG_QUALITY",
                value: jpeg_quality.to_string(),
            });
        }

        let image_size: u32 = parse_or(&lookup, "IMAGE_SIZE", 640)?;
        if image_size == 0 || image_size % 32 != 0 {
            return Err(ConfigError::Invalid {
                key: "IMAGE_SIZE",
                value: image_size.to_string(),
            });
        }

        Ok(Self {
            model_name: lookup("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            thresholds,
            image_size,
            max_detections: parse_or(&lookup, "MAX_DETECTIONS", 300)?,
            jpeg_quality,
            port: parse_or(&lookup, "PORT", 8080)?,
            runtime_api: lookup("AWS_LAMBDA_RUNTIME_API").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn check_unit(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { key, value })
    }
}
