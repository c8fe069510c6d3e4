//! # Overview
//!
//! Screens single video frames for weapon-related objects. A pretrained
//! [YOLOv8](https://github.com/ultralytics/ultralytics) model in ONNX format runs through
//! onnxruntime (bindings via [ort](https://github.com/pykeio/ort)); the detections above
//! [`analyzer::CONFIDENCE_THRESHOLD`] are reported, with those whose label is in
//! [`analyzer::SENSITIVE_LABELS`] listed again as sensitive.
//!
//! ```no_run
//! use frame_moderation_ort::{FrameAnalyzer, models::{YOLOv8Model, YOLOv8PretrainedModels}};
//!
//! let model = YOLOv8Model::pretrained(YOLOv8PretrainedModels::Nano)?;
//! let analyzer = FrameAnalyzer::new(model);
//! println!("{:?}", analyzer.analyze("frame_0001.jpg"));
//! # Ok::<(), frame_moderation_ort::Error>(())
//! ```

pub mod analyzer;
mod detection;
mod error;
pub mod models;
pub mod moderation;
pub mod output;
mod utils;

pub use error::{Error, Result};

// re-exports
pub use image;
pub use ort;

pub use analyzer::{AnalysisResult, FrameAnalyzer};
pub use detection::{BoundingBox, Detection, RawDetection};
pub use moderation::{aggregate, ModerationStatus, ModerationVerdict};
