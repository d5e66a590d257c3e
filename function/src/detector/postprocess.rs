//! YOLOv8 head decoding and non-maximum suppression.

use ndarray::ArrayView2;

use super::RawDetection;

/// Maps model-input coordinates back onto the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputScale {
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

impl InputScale {
    pub fn new(source_width: u32, source_height: u32, input_size: u32) -> Self {
        Self {
            x: source_width as f32 / input_size as f32,
            y: source_height as f32 / input_size as f32,
            width: source_width,
            height: source_height,
        }
    }
}

/// Decodes a `[4 + classes, candidates]` YOLOv8 output.
///
/// Rows 0..4 hold `cx, cy, w, h` in model-input pixels, the remaining rows
/// per-class scores. Candidates below `conf_threshold` and boxes that
/// collapse after clipping to the image are dropped.
pub fn decode_candidates(
    output: ArrayView2<'_, f32>,
    conf_threshold: f32,
    scale: InputScale,
) -> Vec<RawDetection> {
    let (rows, candidates) = output.dim();
    if rows <= 4 {
        return Vec::new();
    }

    let max_x = scale.width as f32;
    let max_y = scale.height as f32;
    let mut detections = Vec::new();

    for i in 0..candidates {
        let mut class_id = 0;
        let mut confidence = f32::MIN;
        for row in 4..rows {
            let score = output[[row, i]];
            if score > confidence {
                confidence = score;
                class_id = row - 4;
            }
        }
        if confidence.is_nan() || confidence < conf_threshold {
            continue;
        }

        let cx = output[[0, i]];
        let cy = output[[1, i]];
        let w = output[[2, i]];
        let h = output[[3, i]];
        let bbox = [
            ((cx - w / 2.0) * scale.x).clamp(0.0, max_x),
            ((cy - h / 2.0) * scale.y).clamp(0.0, max_y),
            ((cx + w / 2.0) * scale.x).clamp(0.0, max_x),
            ((cy + h / 2.0) * scale.y).clamp(0.0, max_y),
        ];
        if bbox[0] >= bbox[2] || bbox[1] >= bbox[3] {
            continue;
        }

        detections.push(RawDetection {
            class_id,
            confidence: confidence.min(1.0),
            bbox,
        });
    }

    detections
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Class-aware greedy NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn det(class_id: usize, confidence: f32, bbox: [f32; 4]) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox,
        }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        let half = [5.0, 0.0, 15.0, 10.0];
        assert!((iou(&a, &half) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn nms_suppresses_overlapping_same_class() {
        let kept = non_max_suppression(
            vec![
                det(0, 0.6, [1.0, 1.0, 11.0, 11.0]),
                det(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
                det(1, 0.8, [0.0, 0.0, 10.0, 10.0]),
                det(0, 0.5, [50.0, 50.0, 60.0, 60.0]),
            ],
            0.45,
            300,
        );
        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.8, 0.5]);
    }

    #[test]
    fn nms_respects_max_detections() {
        let candidates = (0..10)
            .map(|i| {
                let x = i as f32 * 20.0;
                det(0, 0.5 + i as f32 * 0.01, [x, 0.0, x + 10.0, 10.0])
            })
            .collect();
        assert_eq!(non_max_suppression(candidates, 0.45, 3).len(), 3);
    }

    #[test]
    fn decodes_and_scales_candidates() {
        // 2 classes, 3 candidates, 64px model input over a 128x32 image.
        let mut output = Array2::<f32>::zeros((6, 3));
        // candidate 0: class 1, above threshold
        output[[0, 0]] = 32.0;
        output[[1, 0]] = 32.0;
        output[[2, 0]] = 16.0;
        output[[3, 0]] = 16.0;
        output[[4, 0]] = 0.1;
        output[[5, 0]] = 0.8;
        // candidate 1: below threshold
        output[[2, 1]] = 10.0;
        output[[3, 1]] = 10.0;
        output[[4, 1]] = 0.2;
        // candidate 2: hangs off the left edge, gets clipped
        output[[0, 2]] = 0.0;
        output[[1, 2]] = 32.0;
        output[[2, 2]] = 16.0;
        output[[3, 2]] = 16.0;
        output[[4, 2]] = 0.7;

        let scale = InputScale::new(128, 32, 64);
        let found = decode_candidates(output.view(), 0.25, scale);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].class_id, 1);
        assert_eq!(found[0].confidence, 0.8);
        assert_eq!(found[0].bbox, [48.0, 12.0, 80.0, 20.0]);

        assert_eq!(found[1].class_id, 0);
        assert_eq!(found[1].bbox, [0.0, 12.0, 16.0, 20.0]);
        for d in &found {
            assert!(d.bbox[0] < d.bbox[2] && d.bbox[1] < d.bbox[3]);
        }
    }

    #[test]
    fn degenerate_output_yields_nothing() {
        let output = Array2::<f32>::zeros((4, 5));
        assert!(decode_candidates(output.view(), 0.25, InputScale::new(10, 10, 32)).is_empty());
    }
}
