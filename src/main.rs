mod args;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use frame_moderation_ort::{
    models::ObjectDetector, output::write_json_line, AnalysisResult, FrameAnalyzer,
};
use tracing_subscriber::EnvFilter;

const EXIT_OK: u8 = 0;
/// No image path was given.
const EXIT_USAGE: u8 = 1;
/// Model could not be loaded; nothing is printed on stdout.
const EXIT_STARTUP_FAILURE: u8 = 2;

fn main() -> ExitCode {
    // stdout carries exactly one JSON line, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = args::Args::parse();

    let Some(image_path) = args.image_path.as_deref() else {
        return ExitCode::from(missing_image_path(io::stdout().lock()));
    };

    let model = match args.load_model() {
        Ok(model) => model,
        Err(err) => {
            tracing::error!(error = %err, "failed to load detection model");
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };
    tracing::debug!(model = model.model_name(), "model ready");

    ExitCode::from(analyze_frame(model, image_path, io::stdout().lock()))
}

fn missing_image_path(out: impl Write) -> u8 {
    emit(out, &AnalysisResult::error("Image path required"), EXIT_USAGE)
}

/// Analyze one frame and print the result. Analysis errors still exit with [`EXIT_OK`].
fn analyze_frame<D: ObjectDetector>(detector: D, image_path: &Path, out: impl Write) -> u8 {
    let analyzer = FrameAnalyzer::new(detector);
    emit(out, &analyzer.analyze(image_path), EXIT_OK)
}

fn emit(out: impl Write, result: &AnalysisResult, code: u8) -> u8 {
    match write_json_line(out, result) {
        Ok(()) => code,
        Err(err) => {
            tracing::error!(error = %err, "failed to write result");
            EXIT_USAGE
        }
    }
}
