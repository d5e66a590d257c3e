use std::sync::Mutex;

use image::RgbImage;
use image::imageops::FilterType;
use ndarray::ArrayView2;
use tch::{CModule, Device, Kind, Tensor};

use super::postprocess::{self, InputScale};
use super::{Detector, DetectorError, InferenceParams, RawDetection};

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// YOLOv8 exported to TorchScript (`yolo export format=torchscript`).
pub struct YoloDetector {
    model: Mutex<CModule>,
    device: Device,
    input_size: u32,
    model_name: String,
    class_names: Vec<String>,
}

impl YoloDetector {
    pub fn load(model_path: &str, input_size: u32) -> Result<Self, DetectorError> {
        let device = Device::cuda_if_available();
        log::info!("loading YOLO model {} on {:?}", model_path, device);
        let model = CModule::load_on_device(model_path, device).map_err(|e| {
            DetectorError::Load {
                model: model_path.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            model: Mutex::new(model),
            device,
            input_size,
            model_name: model_path.to_string(),
            class_names: COCO_CLASSES.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn preprocess(&self, image: &RgbImage) -> Result<Tensor, DetectorError> {
        let size = self.input_size;
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
        let plane = (size * size) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = (y * size + x) as usize;
            data[offset] = pixel[0] as f32 / 255.0;
            data[plane + offset] = pixel[1] as f32 / 255.0;
            data[2 * plane + offset] = pixel[2] as f32 / 255.0;
        }
        Tensor::f_from_slice(&data)
            .and_then(|t| t.f_view([1, 3, size as i64, size as i64]))
            .and_then(|t| t.f_to_device(self.device))
            .map_err(torch_error)
    }
}

fn torch_error(e: tch::TchError) -> DetectorError {
    DetectorError::Inference(e.to_string())
}

/// Flattens a `[1, 4+C, N]` (or `[4+C, N]`) prediction tensor into row-major
/// `f32` data with its `(rows, cols)` shape.
fn prediction_matrix(output: &Tensor) -> Result<(Vec<f32>, usize, usize), DetectorError> {
    let output = output
        .f_to_device(Device::Cpu)
        .and_then(|t| t.f_to_kind(Kind::Float))
        .map_err(torch_error)?;
    let output = if output.dim() == 3 {
        output.f_squeeze_dim(0).map_err(torch_error)?
    } else {
        output
    };
    let shape = output.size();
    if shape.len() != 2 || shape[0] <= 4 {
        return Err(DetectorError::OutputShape(shape));
    }

    let output = output.f_contiguous().map_err(torch_error)?;
    let flat = Vec::<f32>::try_from(&output).map_err(torch_error)?;
    Ok((flat, shape[0] as usize, shape[1] as usize))
}

impl Detector for YoloDetector {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn infer(
        &self,
        image: &RgbImage,
        params: &InferenceParams,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        let input = self.preprocess(image)?;
        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| DetectorError::Inference("model lock poisoned".to_string()))?;
            tch::no_grad(|| model.forward_ts(&[input])).map_err(torch_error)?
        };

        let (flat, rows, cols) = prediction_matrix(&output)?;
        let view = ArrayView2::from_shape((rows, cols), &flat)
            .map_err(|_| DetectorError::OutputShape(vec![rows as i64, cols as i64]))?;

        let scale = InputScale::new(image.width(), image.height(), self.input_size);
        let candidates = postprocess::decode_candidates(view, params.conf_threshold, scale);
        Ok(postprocess::non_max_suppression(
            candidates,
            params.iou_threshold,
            params.max_detections,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batched_predictions_are_flattened() {
        let output = Tensor::from_slice(&[0f32; 2 * 6 * 3]).view([2, 6, 3]).narrow(0, 0, 1);
        let (flat, rows, cols) = prediction_matrix(&output).unwrap();
        assert_eq!((rows, cols), (6, 3));
        assert_eq!(flat.len(), 18);
    }

    #[test]
    fn low_rank_output_is_an_error_not_a_panic() {
        for output in [Tensor::from_slice(&[1f32, 2.0, 3.0]), Tensor::from(0.5f32)] {
            assert!(matches!(
                prediction_matrix(&output),
                Err(DetectorError::OutputShape(_))
            ));
        }
    }

    #[test]
    fn too_few_rows_is_an_output_shape_error() {
        let output = Tensor::from_slice(&[0f32; 4 * 10]).view([1, 4, 10]);
        assert_eq!(
            prediction_matrix(&output).unwrap_err().to_string(),
            "unexpected model output shape [4, 10]"
        );
    }
}
