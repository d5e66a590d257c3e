pub mod annotate;
pub mod postprocess;
#[cfg(feature = "libtorch")]
pub mod yolo;

use std::sync::OnceLock;

use image::RgbImage;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to load model {model}: {reason}")]
    Load { model: String, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<i64>),
}

/// A detection straight out of the model, before class names are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in source-image pixels.
    pub bbox: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

/// Object detector consumed by the request handler.
///
/// Implementations own confidence and IoU filtering: everything `infer`
/// returns has `confidence >= conf_threshold` and has been through NMS.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn class_names(&self) -> &[String];

    fn infer(
        &self,
        image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<Vec<RawDetection>, DetectorError>;

    /// Draws detections onto a copy of `image`.
    fn plot(&self, image: &RgbImage, detections: &[RawDetection]) -> RgbImage {
        annotate::draw_detections(image, detections)
    }

    fn class_name(&self, class_id: usize) -> String {
        self.class_names()
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

type InitFn<D> = Box<dyn Fn() -> Result<D, DetectorError> + Send + Sync>;

/// Process-wide detector, built on first use and kept until the process exits.
///
/// A failed initialisation is not cached; the next request retries it.
pub struct SharedDetector<D> {
    cell: OnceLock<D>,
    init: InitFn<D>,
}

impl<D: Detector> SharedDetector<D> {
    pub fn lazy(init: impl Fn() -> Result<D, DetectorError> + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            init: Box::new(init),
        }
    }

    pub fn ready(detector: D) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(detector);
        Self {
            cell,
            init: Box::new(|| {
                Err(DetectorError::Load {
                    model: "preloaded".into(),
                    reason: "detector was supplied already initialised".into(),
                })
            }),
        }
    }

    pub fn get(&self) -> Result<&D, DetectorError> {
        if let Some(detector) = self.cell.get() {
            return Ok(detector);
        }
        log::info!("initialising detector");
        let detector = (self.init)()?;
        log::info!("detector {} ready", detector.name());
        Ok(self.cell.get_or_init(|| detector))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        names: Vec<String>,
    }

    impl Detector for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn class_names(&self) -> &[String] {
            &self.names
        }

        fn infer(
            &self,
            _image: &RgbImage,
            _params: &InferenceParams,
        ) -> Result<Vec<RawDetection>, DetectorError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn initialises_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = SharedDetector::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Fixed {
                names: vec!["person".into()],
            })
        });

        assert!(!shared.is_initialized());
        shared.get().unwrap();
        shared.get().unwrap();
        assert!(shared.is_initialized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_init_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = SharedDetector::lazy(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DetectorError::Load {
                    model: "m".into(),
                    reason: "missing".into(),
                })
            } else {
                Ok(Fixed { names: vec![] })
            }
        });

        assert!(shared.get().is_err());
        assert!(shared.get().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_class_ids_get_a_placeholder_name() {
        let detector = Fixed {
            names: vec!["person".into(), "bicycle".into()],
        };
        assert_eq!(detector.class_name(1), "bicycle");
        assert_eq!(detector.class_name(7), "class_7");
    }

    #[test]
    fn ready_detector_skips_init() {
        let shared = SharedDetector::ready(Fixed { names: vec![] });
        assert!(shared.is_initialized());
        assert_eq!(shared.get().unwrap().name(), "fixed");
    }
}
