use std::process::Command;

fn analyze_frame() -> Command {
    Command::new(env!("CARGO_BIN_EXE_analyze-frame"))
}

#[test]
fn missing_image_path_prints_error_and_exits_1() {
    let output = analyze_frame().output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "{\"error\": \"Image path required\"}\n"
    );
}

#[test]
fn model_load_failure_prints_nothing_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let bogus_model = dir.path().join("model.onnx");
    std::fs::write(&bogus_model, b"not a model").unwrap();

    let output = analyze_frame()
        .arg("frame.jpg")
        .env("FRAME_MODERATION_MODEL_FILE", &bogus_model)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}
