use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("ort (onnxruntime) error: {0}")]
    Ort(#[from] ort::Error),
    #[error("hf-hub: {0}")]
    HuggingFace(#[from] hf_hub::api::sync::ApiError),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),
    #[error("model returned class index {0} which has no label")]
    UnknownClass(usize),
    #[error("unexpected model output shape {0:?}")]
    UnexpectedOutputShape(Vec<usize>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
