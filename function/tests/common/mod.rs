#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use function::detector::{Detector, DetectorError, InferenceParams, RawDetection};
use function::{DetectionHandler, HandlerSettings, SharedDetector};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Detector returning canned boxes, filtered by the requested confidence.
pub struct ScriptedDetector {
    pub names: Vec<String>,
    pub boxes: Vec<RawDetection>,
    pub fail: bool,
}

impl ScriptedDetector {
    pub fn street_scene() -> Self {
        Self {
            names: vec!["person".into(), "bicycle".into(), "car".into()],
            boxes: vec![
                RawDetection {
                    class_id: 2,
                    confidence: 0.91,
                    bbox: [4.0, 6.0, 40.0, 30.0],
                },
                RawDetection {
                    class_id: 0,
                    confidence: 0.77,
                    bbox: [42.0, 2.0, 60.0, 44.0],
                },
                RawDetection {
                    class_id: 2,
                    confidence: 0.33,
                    bbox: [10.0, 30.0, 20.0, 40.0],
                },
            ],
            fail: false,
        }
    }

    pub fn broken() -> Self {
        Self {
            names: Vec::new(),
            boxes: Vec::new(),
            fail: true,
        }
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn infer(
        &self,
        _image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        if self.fail {
            return Err(DetectorError::Inference("CUDA out of memory".into()));
        }
        Ok(self
            .boxes
            .iter()
            .filter(|b| b.confidence >= params.conf_threshold)
            .take(params.max_detections)
            .cloned()
            .collect())
    }
}

pub fn handler(detector: ScriptedDetector) -> DetectionHandler<ScriptedDetector> {
    DetectionHandler::new(
        Arc::new(SharedDetector::ready(detector)),
        HandlerSettings::default(),
    )
}

pub fn encoded_png(width: u32, height: u32) -> String {
    let image = RgbImage::from_pixel(width, height, Rgb([90, 140, 200]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(buffer.into_inner())
}
