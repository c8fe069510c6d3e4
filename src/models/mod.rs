//! Implemented detection models.

mod yolov8;

pub use yolov8::{coco_label_map, YOLOv8Model, YOLOv8PretrainedModels, COCO_LABELS};

use crate::{detection::RawDetection, Result};

/// Anything that turns an image into class-indexed boxes and can name those classes.
pub trait ObjectDetector {
    /// Run inference. Boxes are in pixel coordinates of `img`.
    fn detect(&self, img: &image::DynamicImage) -> Result<Vec<RawDetection>>;

    /// Label for a class index, `None` if the model does not know it.
    fn label(&self, class_id: usize) -> Option<&str>;
}
