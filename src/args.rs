use std::path::PathBuf;

use clap::Parser;
use frame_moderation_ort::{
    models::{coco_label_map, YOLOv8Model, YOLOv8PretrainedModels},
    ort::Session,
    Result,
};

/// Detect objects in one video frame and print them, with weapon sightings, as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image file to analyze
    #[arg(value_name = "IMAGE", allow_hyphen_values = true)]
    pub image_path: Option<PathBuf>,

    /// Load the ONNX model from this file instead of the Hugging Face hub
    #[arg(long, env = "FRAME_MODERATION_MODEL_FILE", value_name = "FILE")]
    pub model_file: Option<PathBuf>,

    /// Hugging Face repository holding the ONNX model
    #[arg(long, env = "FRAME_MODERATION_HF_REPO", requires = "hf_filename")]
    pub hf_repo: Option<String>,

    /// ONNX file name inside --hf-repo
    #[arg(long, env = "FRAME_MODERATION_HF_FILENAME", requires = "hf_repo")]
    pub hf_filename: Option<String>,

    /// onnxruntime intra-op thread count
    #[arg(long, env = "FRAME_MODERATION_INTRA_THREADS", value_name = "N")]
    pub intra_threads: Option<usize>,

    #[arg(hide = true, trailing_var_arg = true)]
    pub ignored: Vec<String>,
}

impl Args {
    /// Build the detection model described by the options.
    pub fn load_model(&self) -> Result<YOLOv8Model> {
        let mut session_builder = Session::builder()?;
        if let Some(threads) = self.intra_threads {
            session_builder = session_builder.with_intra_threads(threads)?;
        }

        if let Some(path) = &self.model_file {
            tracing::debug!(path = %path.display(), "loading model from file");
            let labels = coco_label_map();
            let labels: Vec<(i64, &str)> = labels.iter().map(|(i, l)| (*i, l.as_str())).collect();
            return YOLOv8Model::new_from_file(path, "yolov8", &labels, session_builder);
        }

        match (&self.hf_repo, &self.hf_filename) {
            (Some(repo), Some(filename)) => YOLOv8Model::from_hub(repo, filename, session_builder),
            _ => YOLOv8Model::configure_pretrained(YOLOv8PretrainedModels::Nano, session_builder),
        }
    }
}
