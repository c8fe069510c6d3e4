use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    detection::{Detection, RawDetection},
    models::ObjectDetector,
    Error, Result,
};

/// Detections must score strictly above this to be reported.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Labels treated as moderation-relevant.
pub const SENSITIVE_LABELS: [&str; 4] = ["knife", "gun", "pistol", "rifle"];

pub fn is_sensitive(label: &str) -> bool {
    SENSITIVE_LABELS.contains(&label)
}

/// Outcome of analyzing one frame, serialized as the JSON payload printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Error {
        error: String,
    },
    Report {
        detections: Vec<Detection>,
        sensitive_detections: Vec<Detection>,
    },
}

impl AnalysisResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Build a report, picking out the sensitive subsequence while keeping order.
    pub fn from_detections(detections: Vec<Detection>) -> Self {
        let sensitive_detections = detections
            .iter()
            .filter(|d| is_sensitive(&d.label))
            .cloned()
            .collect();

        Self::Report {
            detections,
            sensitive_detections,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Runs a loaded detector over single image files.
pub struct FrameAnalyzer<D> {
    detector: D,
}

impl<D: ObjectDetector> FrameAnalyzer<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Analyze the image at `image_path`. Never fails: errors become [`AnalysisResult::Error`].
    pub fn analyze(&self, image_path: impl AsRef<Path>) -> AnalysisResult {
        let image_path = image_path.as_ref();

        match self.try_analyze(image_path) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(path = %image_path.display(), error = %err, "frame analysis failed");
                AnalysisResult::error(err.to_string())
            }
        }
    }

    fn try_analyze(&self, image_path: &Path) -> Result<AnalysisResult> {
        if !image_path.exists() {
            return Err(Error::ImageNotFound(image_path.to_path_buf()));
        }

        // sniff the format from content, the extension may be missing or wrong
        let img = image::ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()?;
        let raw = self.detector.detect(&img)?;
        let detections = self.normalize(raw)?;

        Ok(AnalysisResult::from_detections(detections))
    }

    /// Resolve labels and apply [`CONFIDENCE_THRESHOLD`] on the unrounded score.
    fn normalize(&self, raw: Vec<RawDetection>) -> Result<Vec<Detection>> {
        let mut detections = vec![];

        for det in raw {
            let label = self
                .detector
                .label(det.class_id)
                .ok_or(Error::UnknownClass(det.class_id))?;

            if det.confidence > CONFIDENCE_THRESHOLD {
                detections.push(Detection::new(label, det.confidence, det.bbox));
            }
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tempfile::TempDir;

    use super::*;
    use crate::detection::BoundingBox;

    struct FakeDetector {
        labels: Vec<&'static str>,
        output: Vec<RawDetection>,
        failure: Option<&'static str>,
    }

    impl FakeDetector {
        fn returning(output: Vec<RawDetection>) -> Self {
            Self {
                labels: vec!["person", "car", "knife", "gun", "scissors"],
                output,
                failure: None,
            }
        }
    }

    impl ObjectDetector for FakeDetector {
        fn detect(&self, _img: &image::DynamicImage) -> Result<Vec<RawDetection>> {
            match self.failure {
                Some(msg) => Err(io::Error::new(io::ErrorKind::Other, msg).into()),
                None => Ok(self.output.clone()),
            }
        }

        fn label(&self, class_id: usize) -> Option<&str> {
            self.labels.get(class_id).copied()
        }
    }

    fn raw(class_id: usize, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: BoundingBox::new(10.0, 20.0, 110.5, 220.25),
        }
    }

    fn frame() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_is_reported_not_raised() {
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![]));

        let result = analyzer.analyze("/definitely/not/here.jpg");

        assert_eq!(
            result,
            AnalysisResult::error("Image file not found: /definitely/not/here.jpg")
        );
    }

    #[test]
    fn knife_and_car() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(2, 0.9), raw(1, 0.6)]));

        let AnalysisResult::Report {
            detections,
            sensitive_detections,
        } = analyzer.analyze(&path)
        else {
            panic!("expected a report");
        };

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "knife");
        assert_eq!(detections[1].label, "car");
        assert_eq!(sensitive_detections, vec![detections[0].clone()]);
    }

    #[test]
    fn threshold_is_strict() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![
            raw(0, 0.5),
            raw(0, 0.5001),
            raw(3, 0.49),
        ]));

        let AnalysisResult::Report { detections, .. } = analyzer.analyze(&path) else {
            panic!("expected a report");
        };

        assert_eq!(detections.len(), 1);
        // compared before rounding, reported after
        assert_eq!(detections[0].confidence, 0.5);
    }

    #[test]
    fn nothing_above_threshold_gives_empty_lists() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(2, 0.3)]));

        let result = analyzer.analyze(&path);

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"detections":[],"sensitive_detections":[]}"#
        );
    }

    #[test]
    fn sensitive_is_ordered_subsequence() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![
            raw(3, 0.95),
            raw(0, 0.9),
            raw(4, 0.85),
            raw(2, 0.8),
            raw(1, 0.7),
        ]));

        let AnalysisResult::Report {
            detections,
            sensitive_detections,
        } = analyzer.analyze(&path)
        else {
            panic!("expected a report");
        };

        let labels: Vec<_> = sensitive_detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["gun", "knife"]);

        let mut remaining = detections.iter();
        for s in &sensitive_detections {
            assert!(remaining.any(|d| d == s));
        }
    }

    #[test]
    fn confidence_is_rounded() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(1, 0.87654)]));

        let AnalysisResult::Report { detections, .. } = analyzer.analyze(&path) else {
            panic!("expected a report");
        };

        assert_eq!(detections[0].confidence, 0.877);
        assert_eq!(detections[0].bbox, BoundingBox::new(10.0, 20.0, 110.5, 220.25));
    }

    #[test]
    fn repeated_analysis_is_identical() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(2, 0.9), raw(1, 0.6)]));

        assert_eq!(analyzer.analyze(&path), analyzer.analyze(&path));
    }

    #[test]
    fn inference_failure_becomes_error_payload() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector {
            failure: Some("session exploded"),
            ..FakeDetector::returning(vec![])
        });

        assert_eq!(analyzer.analyze(&path), AnalysisResult::error("session exploded"));
    }

    #[test]
    fn unknown_class_becomes_error_payload() {
        let (_dir, path) = frame();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(42, 0.9)]));

        let result = analyzer.analyze(&path);

        assert_eq!(
            result,
            AnalysisResult::error("model returned class index 42 which has no label")
        );
    }

    #[test]
    fn format_is_detected_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("frame");
        let misnamed = dir.path().join("frame.jpg");
        for path in [&bare, &misnamed] {
            image::RgbImage::new(8, 8)
                .save_with_format(path, image::ImageFormat::Png)
                .unwrap();
        }
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![raw(2, 0.9)]));

        for path in [&bare, &misnamed] {
            let AnalysisResult::Report { detections, .. } = analyzer.analyze(path) else {
                panic!("expected a report for {}", path.display());
            };
            assert_eq!(detections.len(), 1);
        }
    }

    #[test]
    fn undecodable_image_becomes_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, b"not an image").unwrap();
        let analyzer = FrameAnalyzer::new(FakeDetector::returning(vec![]));

        assert!(analyzer.analyze(&path).is_error());
    }
}
