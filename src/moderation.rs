//! Folding per-frame results of one video into a single moderation verdict.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{analyzer::AnalysisResult, detection::Detection};

/// Sensitive detections above this confidence count as weapon sightings.
pub const WEAPON_CONFIDENCE: f64 = 0.6;
/// Highest weapon confidence above which a video is flagged outright.
pub const FLAG_CONFIDENCE: f64 = 0.7;
/// Weapon sightings at or above this count flag the video.
pub const FLAG_COUNT: usize = 2;
pub const REVIEW_CONFIDENCE: f64 = 0.3;
/// Share of frames with sensitive detections that sends a video to review.
pub const REVIEW_RATIO: f64 = 0.3;
pub const MAX_SCORE: f64 = 0.9;
/// How many detections a verdict keeps for storage.
pub const KEPT_DETECTIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Safe,
    Review,
    Flagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
    pub status: ModerationStatus,
    pub score: f64,
    pub reason: String,
    /// Unique sensitive labels, first-seen order.
    pub detected_objects: Vec<String>,
    pub sensitive_frame_count: usize,
    pub total_frames: usize,
    pub all_detections: Vec<Detection>,
}

impl ModerationVerdict {
    fn safe(total_frames: usize) -> Self {
        Self {
            status: ModerationStatus::Safe,
            score: 0.0,
            reason: String::new(),
            detected_objects: vec![],
            sensitive_frame_count: 0,
            total_frames,
            all_detections: vec![],
        }
    }
}

/// Aggregate the analysis results of a video's sampled frames.
///
/// Frames that errored are skipped but still counted in `total_frames`.
pub fn aggregate(results: &[AnalysisResult]) -> ModerationVerdict {
    if results.is_empty() {
        return ModerationVerdict::safe(0);
    }

    let mut all_detections = vec![];
    let mut sensitive = vec![];
    let mut sensitive_frame_count = 0;

    for (i, result) in results.iter().enumerate() {
        match result {
            AnalysisResult::Error { error } => {
                tracing::warn!(frame = i + 1, %error, "skipping frame that failed analysis");
            }
            AnalysisResult::Report {
                detections,
                sensitive_detections,
            } => {
                all_detections.extend(detections.iter().cloned());
                if !sensitive_detections.is_empty() {
                    sensitive.extend(sensitive_detections.iter().cloned());
                    sensitive_frame_count += 1;
                }
            }
        }
    }

    let total_frames = results.len();
    let detected_objects: Vec<String> = sensitive.iter().map(|d| d.label.clone()).unique().collect();
    let objects = detected_objects.join(", ");
    let sensitive_ratio = sensitive_frame_count as f64 / total_frames as f64;

    let weapons = sensitive
        .iter()
        .filter(|d| d.confidence > WEAPON_CONFIDENCE)
        .collect_vec();

    let (status, score, reason) = if let Some(max_confidence) =
        weapons.iter().map(|d| d.confidence).max_by(f64::total_cmp)
    {
        let count = weapons.len();

        if max_confidence > FLAG_CONFIDENCE || count >= FLAG_COUNT {
            (
                ModerationStatus::Flagged,
                f64::min(MAX_SCORE, max_confidence),
                format!("Weapons detected: {objects} ({count} detections)"),
            )
        } else if max_confidence > REVIEW_CONFIDENCE || sensitive_ratio > REVIEW_RATIO {
            (
                ModerationStatus::Review,
                max_confidence * 0.7,
                format!("Potential sensitive content: {objects}"),
            )
        } else {
            (ModerationStatus::Safe, 0.0, String::new())
        }
    } else if sensitive_ratio > REVIEW_RATIO {
        (
            ModerationStatus::Review,
            sensitive_ratio * 0.5,
            format!("Multiple sensitive objects detected: {objects}"),
        )
    } else {
        (ModerationStatus::Safe, 0.0, String::new())
    };

    all_detections.truncate(KEPT_DETECTIONS);

    ModerationVerdict {
        status,
        score,
        reason,
        detected_objects,
        sensitive_frame_count,
        total_frames,
        all_detections,
    }
}
