use std::sync::Arc;

use serde_json::Value;
use shared::{
    DetectionBody, DetectionRequest, DetectionResponse, DetectionResult, DetectionSummary,
};

use crate::config::{FunctionConfig, Thresholds};
use crate::detector::{Detector, InferenceParams, RawDetection, SharedDetector};
use crate::error::HandlerError;
use crate::imaging;
use crate::timing::TimingAccumulator;

pub const PHASE_DECODE: &str = "base64_decode";
pub const PHASE_YOLO_TOTAL: &str = "yolo_total";
pub const PHASE_INFERENCE: &str = "inference";
pub const PHASE_DRAW: &str = "draw_results";
pub const PHASE_DETECTION_LIST: &str = "build_detection_list";
pub const PHASE_ENCODE: &str = "base64_encode";
pub const PHASE_SUMMARY: &str = "build_summary";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlerSettings {
    pub thresholds: Thresholds,
    pub max_detections: usize,
    pub jpeg_quality: u8,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            max_detections: 300,
            jpeg_quality: 85,
        }
    }
}

impl From<&FunctionConfig> for HandlerSettings {
    fn from(config: &FunctionConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            max_detections: config.max_detections,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

pub struct DetectionHandler<D> {
    detector: Arc<SharedDetector<D>>,
    settings: HandlerSettings,
}

impl<D: Detector> DetectionHandler<D> {
    pub fn new(detector: Arc<SharedDetector<D>>, settings: HandlerSettings) -> Self {
        Self { detector, settings }
    }

    /// Handles one invocation event. Never fails: errors become 400/500 envelopes.
    pub fn handle(&self, event: Value) -> DetectionResponse {
        match self.process(event) {
            Ok(body) => {
                log::info!(
                    "detected {} object(s) in {:.2} ms",
                    body.summary.total_detections,
                    body.timings.total_ms
                );
                DetectionResponse::success(body)
            }
            Err(e) => {
                log::error!("request failed ({}): {}", e.kind(), e);
                DetectionResponse::failure(e.kind(), e.public_message())
            }
        }
    }

    fn process(&self, event: Value) -> Result<DetectionBody, HandlerError> {
        let mut timer = TimingAccumulator::new();

        let request = parse_request(event)?;
        let thresholds = self
            .settings
            .thresholds
            .resolve(request.conf_threshold, request.iou_threshold)?;
        log::info!(
            "confidence threshold {}, IoU threshold {}",
            thresholds.confidence,
            thresholds.iou
        );
        let params = InferenceParams {
            conf_threshold: thresholds.confidence,
            iou_threshold: thresholds.iou,
            max_detections: self.settings.max_detections,
        };

        let image = timer.time(PHASE_DECODE, |_| {
            imaging::decode_base64_image(&request.image)
        })?;
        log::info!("image {}x{}", image.width(), image.height());

        let (annotated, detections) =
            timer.time(PHASE_YOLO_TOTAL, |timer| -> Result<_, HandlerError> {
                let detector = self.detector.get()?;
                let raw = timer.time(PHASE_INFERENCE, |_| detector.infer(&image, &params))?;
                let annotated = timer.time(PHASE_DRAW, |_| detector.plot(&image, &raw));
                let detections =
                    timer.time(PHASE_DETECTION_LIST, |_| build_detection_list(detector, &raw));
                Ok((annotated, detections))
            })?;

        let annotated_image = timer.time(PHASE_ENCODE, |_| {
            imaging::encode_base64_jpeg(&annotated, self.settings.jpeg_quality)
        })?;

        let summary = timer.time(PHASE_SUMMARY, |_| {
            DetectionSummary::from_detections(&detections)
        });

        let timings = timer.snapshot()?;
        timings.walk(|depth, phase| {
            log::debug!(
                "{:indent$}{}: {:.2} ms",
                "",
                phase.name,
                phase.duration_ms,
                indent = depth * 2
            );
        });
        let inference_time_ms = timings
            .find(&[PHASE_YOLO_TOTAL, PHASE_INFERENCE])
            .map(|p| p.duration_ms);

        Ok(DetectionBody {
            annotated_image,
            detections,
            summary,
            timings,
            inference_time_ms,
        })
    }
}

fn parse_request(event: Value) -> Result<DetectionRequest, HandlerError> {
    let Value::Object(fields) = &event else {
        return Err(HandlerError::InvalidRequest(
            "event must be a JSON object".to_string(),
        ));
    };
    if !fields.contains_key("image") {
        return Err(HandlerError::MissingImage);
    }
    serde_json::from_value(event).map_err(|e| HandlerError::InvalidRequest(e.to_string()))
}

pub fn build_detection_list<D: Detector + ?Sized>(
    detector: &D,
    raw: &[RawDetection],
) -> Vec<DetectionResult> {
    raw.iter()
        .map(|d| DetectionResult {
            class_id: d.class_id as u32,
            class_name: detector.class_name(d.class_id),
            confidence: d.confidence,
            bbox: d.bbox,
        })
        .collect()
}
