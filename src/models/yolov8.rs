use std::path::{Path, PathBuf};

use image::imageops;
use ndarray::{s, Array, Array1, ArrayView2, Dim, Ix3};
use ort::{Session, SessionBuilder, SessionOutputs};

pub use crate::error::{Error, Result};
use crate::{
    detection::{BoundingBox, RawDetection},
    utils,
};

use super::ObjectDetector;

/// The 80 COCO class names, in the index order YOLOv8 was trained with.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// A [`YOLOv8`](https://github.com/ultralytics/ultralytics) detection model exported to ONNX.
pub struct YOLOv8Model {
    model_name: String,
    model: ort::Session,
    label_map: Vec<(i64, String)>,
}

#[derive(PartialEq, Debug, Clone, Copy)]
/// Pretrained COCO YOLOv8 models from Hugging Face.
pub enum YOLOv8PretrainedModels {
    Nano,
    Small,
}

impl YOLOv8PretrainedModels {
    /// Model name.
    pub fn name(&self) -> &str {
        match self {
            YOLOv8PretrainedModels::Nano => "yolov8n",
            YOLOv8PretrainedModels::Small => "yolov8s",
        }
    }

    /// Hugging Face repository for this model.
    pub fn hf_repo(&self) -> &str {
        match self {
            YOLOv8PretrainedModels::Nano => "Kalray/yolov8n",
            YOLOv8PretrainedModels::Small => "Kalray/yolov8s",
        }
    }

    /// Path for this model file in Hugging Face repository.
    pub fn hf_filename(&self) -> &str {
        match self {
            YOLOv8PretrainedModels::Nano => "yolov8n.onnx",
            YOLOv8PretrainedModels::Small => "yolov8s.onnx",
        }
    }

    /// The label map for this model.
    pub fn label_map(&self) -> Vec<(i64, String)> {
        coco_label_map()
    }
}

pub fn coco_label_map() -> Vec<(i64, String)> {
    COCO_LABELS
        .iter()
        .enumerate()
        .map(|(i, l)| (i as i64, l.to_string()))
        .collect()
}

/// Download `filename` from `repo` on the Hugging Face hub, or reuse the cached copy.
pub(crate) fn fetch_from_hub(repo: &str, filename: &str) -> Result<PathBuf> {
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_progress(false)
        .build()?;
    let path = api.model(repo.to_string()).get(filename)?;
    tracing::debug!(repo, filename, path = %path.display(), "resolved model weights");
    Ok(path)
}

impl YOLOv8Model {
    /// Square input resolution the model was exported with.
    pub const INPUT_SIZE: u32 = 640;
    /// Letterbox fill value, as used by ultralytics.
    pub const PAD_VALUE: f32 = 114.0;
    /// Best-class score a candidate must exceed before NMS.
    pub const CANDIDATE_THRESHOLD: f32 = 0.25;
    pub const IOU_THRESHOLD: f32 = 0.7;
    pub const MAX_DETECTIONS: usize = 300;

    /// Construct a [`YOLOv8Model`] with a pretrained model downloaded from Hugging Face.
    pub fn pretrained(p_model: YOLOv8PretrainedModels) -> Result<Self> {
        Self::configure_pretrained(p_model, Session::builder()?)
    }

    /// Construct a configured [`YOLOv8Model`] with a pretrained model downloaded from Hugging Face.
    pub fn configure_pretrained(
        p_model: YOLOv8PretrainedModels,
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        let filename = fetch_from_hub(p_model.hf_repo(), p_model.hf_filename())?;
        let model = session_builder.commit_from_file(filename)?;

        Ok(Self {
            model_name: p_model.name().to_string(),
            model,
            label_map: p_model.label_map(),
        })
    }

    /// Construct a [`YOLOv8Model`] from a COCO-trained file in any Hugging Face repository.
    pub fn from_hub(repo: &str, filename: &str, session_builder: SessionBuilder) -> Result<Self> {
        let path = fetch_from_hub(repo, filename)?;
        let model = session_builder.commit_from_file(path)?;

        Ok(Self {
            model_name: repo.to_string(),
            model,
            label_map: coco_label_map(),
        })
    }

    /// Construct a [`YOLOv8Model`] from a model file.
    pub fn new_from_file(
        file_path: impl AsRef<Path>,
        model_name: &str,
        label_map: &[(i64, &str)],
        session_builder: SessionBuilder,
    ) -> Result<Self> {
        let model = session_builder.commit_from_file(file_path)?;

        Ok(Self {
            model_name: model_name.to_string(),
            model,
            label_map: label_map.iter().map(|(i, l)| (*i, l.to_string())).collect(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Predict [`RawDetection`]s from the image provided, in descending confidence order.
    pub fn predict(&self, img: &image::DynamicImage) -> Result<Vec<RawDetection>> {
        let (input, letterbox) = self.preprocess(img);

        let input_name = &self.model.inputs[0].name;
        let outputs = self.model.run(ort::inputs![input_name => input]?)?;

        let mut detections = self.postprocess(&outputs)?;

        let (img_width, img_height) = (img.width() as f32, img.height() as f32);
        for det in detections.iter_mut() {
            det.bbox.transform(|x, y| letterbox.unscale(x, y));
            det.bbox.clip(img_width, img_height);
        }

        tracing::debug!(
            model = %self.model_name,
            count = detections.len(),
            "yolov8 inference finished"
        );

        Ok(detections)
    }

    fn preprocess(
        &self,
        img: &image::DynamicImage,
    ) -> (Array<f32, Dim<[usize; 4]>>, Letterbox) {
        let size = Self::INPUT_SIZE;
        let letterbox = Letterbox::fit(img.width(), img.height(), size);

        let mut padded_img = Array::from_elem(
            (1, 3, size as usize, size as usize),
            Self::PAD_VALUE / 255.0,
        );

        let resized_img = img.resize_exact(
            letterbox.width,
            letterbox.height,
            imageops::FilterType::Triangle,
        );

        let (left, top) = (letterbox.left as usize, letterbox.top as usize);
        for (x, y, pixel) in resized_img.into_rgb8().enumerate_pixels() {
            let (x, y) = (x as usize + left, y as usize + top);
            let [r, g, b] = pixel.0;
            padded_img[[0, 0, y, x]] = r as f32 / 255.0;
            padded_img[[0, 1, y, x]] = g as f32 / 255.0;
            padded_img[[0, 2, y, x]] = b as f32 / 255.0;
        }

        (padded_img, letterbox)
    }

    fn postprocess<'s>(&self, outputs: &SessionOutputs<'s>) -> Result<Vec<RawDetection>> {
        let output = outputs[0].try_extract_tensor::<f32>()?;
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(Error::UnexpectedOutputShape(shape));
        }

        let output = output.into_dimensionality::<Ix3>()?;
        // [4 + classes, anchors] -> [anchors, 4 + classes]
        let predictions = output.slice(s![0, .., ..]);
        let candidates = decode_predictions(predictions.t(), Self::CANDIDATE_THRESHOLD);

        Ok(non_max_suppression(
            candidates,
            Self::IOU_THRESHOLD,
            Self::MAX_DETECTIONS,
        ))
    }
}

impl ObjectDetector for YOLOv8Model {
    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<RawDetection>> {
        self.predict(img)
    }

    fn label(&self, class_id: usize) -> Option<&str> {
        self.label_map
            .iter()
            .find(|(l_i, _)| *l_i == class_id as i64)
            .map(|(_, l)| l.as_str())
    }
}

/// Placement of an image scaled into the square model input, centered with padding
/// on both sides the way ultralytics letterboxes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    ratio: f32,
    width: u32,
    height: u32,
    left: u32,
    top: u32,
}

impl Letterbox {
    fn fit(img_width: u32, img_height: u32, size: u32) -> Self {
        let ratio = f32::min(
            size as f32 / img_height as f32,
            size as f32 / img_width as f32,
        );
        let width = ((img_width as f32 * ratio).round() as u32).clamp(1, size);
        let height = ((img_height as f32 * ratio).round() as u32).clamp(1, size);

        // half the slack on each side; odd slack puts the extra pixel right/bottom
        let dw = (size - width) as f32 / 2.0;
        let dh = (size - height) as f32 / 2.0;

        Self {
            ratio,
            width,
            height,
            left: (dw - 0.1).round().max(0.0) as u32,
            top: (dh - 0.1).round().max(0.0) as u32,
        }
    }

    /// Map a point in model input space back to the original image.
    fn unscale(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.left as f32) / self.ratio,
            (y - self.top as f32) / self.ratio,
        )
    }
}

/// Turn rows of `[cx, cy, w, h, class scores...]` into candidates whose best class score
/// exceeds `score_thr`. Coordinates stay in model input space.
fn decode_predictions(predictions: ArrayView2<f32>, score_thr: f32) -> Vec<RawDetection> {
    predictions
        .rows()
        .into_iter()
        .filter_map(|row| {
            let (class_id, confidence) = utils::first_max(row.slice(s![4..]))?;
            if confidence <= score_thr {
                return None;
            }

            Some(RawDetection {
                class_id,
                confidence,
                bbox: BoundingBox::from_center(row[0], row[1], row[2], row[3]),
            })
        })
        .collect()
}

/// Class-aware greedy NMS. Output is sorted by descending confidence.
fn non_max_suppression(
    candidates: Vec<RawDetection>,
    iou_thr: f32,
    max_det: usize,
) -> Vec<RawDetection> {
    let scores = Array1::from_iter(candidates.iter().map(|c| c.confidence));
    let order = utils::argsort_by(&scores, |a, b| b.total_cmp(a));

    let mut keep: Vec<RawDetection> = vec![];

    for i in order {
        if keep.len() >= max_det {
            break;
        }

        let candidate = &candidates[i];
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_thr
        });

        if !suppressed {
            keep.push(candidate.clone());
        }
    }

    keep
}
