//! Pose keypoint data model.
//!
//! A `PoseSample` is one inference result from a pose source: a set of named
//! body landmarks with 2D positions and confidence scores. Samples are
//! best-effort; any landmark may be absent (occlusion, low confidence).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The 17 COCO body landmarks produced by single-person pose models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// A detected landmark: image-space position plus model confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypoint {
    pub kind: KeypointKind,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(kind: KeypointKind, x: f32, y: f32, score: f32) -> Self {
        Self { kind, x, y, score }
    }
}

/// One pose estimate captured at a single instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseSample {
    pub keypoints: Vec<Keypoint>,
    pub captured_at: DateTime<Utc>,
}

impl PoseSample {
    pub fn new(keypoints: Vec<Keypoint>, captured_at: DateTime<Utc>) -> Self {
        Self {
            keypoints,
            captured_at,
        }
    }

    pub fn keypoint(&self, kind: KeypointKind) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.kind == kind)
    }

    /// Both shoulder landmarks, or `None` if either is missing from the sample.
    pub fn shoulder_pair(&self) -> Option<(&Keypoint, &Keypoint)> {
        let left = self.keypoint(KeypointKind::LeftShoulder)?;
        let right = self.keypoint(KeypointKind::RightShoulder)?;
        Some((left, right))
    }

    /// Average shoulder height, the single scalar posture evaluation runs on.
    pub fn shoulder_y(&self) -> Option<f32> {
        self.shoulder_pair()
            .map(|(left, right)| (left.y + right.y) / 2.0)
    }

    /// Copy of this sample with landmarks below `min_score` dropped, so a
    /// barely-detected shoulder reads as absent rather than as a bogus height.
    pub fn confident(&self, min_score: f32) -> PoseSample {
        PoseSample {
            keypoints: self
                .keypoints
                .iter()
                .copied()
                .filter(|kp| kp.score >= min_score)
                .collect(),
            captured_at: self.captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoulders(left_y: f32, right_y: f32) -> PoseSample {
        PoseSample::new(
            vec![
                Keypoint::new(KeypointKind::LeftShoulder, 220.0, left_y, 0.9),
                Keypoint::new(KeypointKind::RightShoulder, 420.0, right_y, 0.9),
            ],
            Utc::now(),
        )
    }

    #[test]
    fn shoulder_y_averages_both_shoulders() {
        let sample = shoulders(200.0, 210.0);
        assert_eq!(sample.shoulder_y(), Some(205.0));
    }

    #[test]
    fn shoulder_y_is_none_when_one_shoulder_missing() {
        let sample = PoseSample::new(
            vec![Keypoint::new(KeypointKind::LeftShoulder, 220.0, 200.0, 0.9)],
            Utc::now(),
        );
        assert!(sample.shoulder_y().is_none());
    }

    #[test]
    fn confident_drops_low_score_landmarks() {
        let sample = PoseSample::new(
            vec![
                Keypoint::new(KeypointKind::LeftShoulder, 220.0, 200.0, 0.9),
                Keypoint::new(KeypointKind::RightShoulder, 420.0, 210.0, 0.1),
            ],
            Utc::now(),
        );
        let filtered = sample.confident(0.3);
        assert_eq!(filtered.keypoints.len(), 1);
        assert!(filtered.shoulder_y().is_none());
    }

    #[test]
    fn keypoint_lookup_finds_by_kind() {
        let sample = shoulders(200.0, 210.0);
        let left = sample.keypoint(KeypointKind::LeftShoulder).unwrap();
        assert_eq!(left.x, 220.0);
        assert!(sample.keypoint(KeypointKind::Nose).is_none());
    }
}
