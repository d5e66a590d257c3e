use serde::{Deserialize, Serialize};

/// One detected object, in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` with `x1 < x2` and `y1 < y2`.
    pub bbox: [f32; 4],
}

impl DetectionResult {
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_detections: usize,
    /// Distinct class names in first-seen order.
    pub classes_detected: Vec<String>,
}

impl DetectionSummary {
    pub fn from_detections(detections: &[DetectionResult]) -> Self {
        let mut classes_detected: Vec<String> = Vec::new();
        for detection in detections {
            if !classes_detected.iter().any(|c| c == &detection.class_name) {
                classes_detected.push(detection.class_name.clone());
            }
        }

        Self {
            total_detections: detections.len(),
            classes_detected,
        }
    }
}
