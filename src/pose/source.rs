//! Pose source abstraction.
//!
//! The monitor core never talks to a camera or a model directly; it consumes
//! samples from whatever `PoseSource` the host wires in. Camera access and
//! inference failures stay on this side of the boundary and are surfaced as
//! source errors, never as monitor errors.

use std::collections::VecDeque;
use std::f32::consts::PI;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::keypoint::{Keypoint, KeypointKind, PoseSample};

/// Produces zero or one pose sample per poll. `Ok(None)` means the source had
/// nothing for this frame (no person detected, dropped frame); the caller
/// keeps polling.
#[async_trait]
pub trait PoseSource: Send {
    async fn next_sample(&mut self) -> Result<Option<PoseSample>>;
}

/// Plays back a scripted sequence of samples, then reports exhaustion as
/// `Ok(None)` forever. Drives tests and offline replays.
pub struct ReplaySource {
    samples: VecDeque<Option<PoseSample>>,
}

impl ReplaySource {
    pub fn new(samples: Vec<Option<PoseSample>>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    pub fn from_samples(samples: Vec<PoseSample>) -> Self {
        Self::new(samples.into_iter().map(Some).collect())
    }
}

#[async_trait]
impl PoseSource for ReplaySource {
    async fn next_sample(&mut self) -> Result<Option<PoseSample>> {
        Ok(self.samples.pop_front().flatten())
    }
}

/// Synthetic sitter for the demo binary: shoulders start at a resting height
/// and drift down and back up on a slow sine, so the monitor periodically
/// crosses its margin without a camera attached.
pub struct DriftSource {
    rest_y: f32,
    amplitude: f32,
    period_samples: u32,
    tick: u32,
}

impl DriftSource {
    pub fn new(rest_y: f32, amplitude: f32, period_samples: u32) -> Self {
        Self {
            rest_y,
            amplitude,
            period_samples: period_samples.max(1),
            tick: 0,
        }
    }
}

impl Default for DriftSource {
    fn default() -> Self {
        // Slouches ~25px past rest over a two-minute period at 500ms sampling.
        Self::new(240.0, 25.0, 240)
    }
}

#[async_trait]
impl PoseSource for DriftSource {
    async fn next_sample(&mut self) -> Result<Option<PoseSample>> {
        let phase = 2.0 * PI * (self.tick % self.period_samples) as f32
            / self.period_samples as f32;
        self.tick = self.tick.wrapping_add(1);

        // Positive half of the sine only: drift down from rest, never above it.
        let droop = self.amplitude * phase.sin().max(0.0);
        let y = self.rest_y + droop;

        Ok(Some(PoseSample::new(
            vec![
                Keypoint::new(KeypointKind::LeftShoulder, 220.0, y - 1.5, 0.85),
                Keypoint::new(KeypointKind::RightShoulder, 420.0, y + 1.5, 0.85),
            ],
            Utc::now(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_source_yields_samples_then_none() {
        let sample = PoseSample::new(
            vec![Keypoint::new(KeypointKind::LeftShoulder, 0.0, 100.0, 0.9)],
            Utc::now(),
        );
        let mut source = ReplaySource::new(vec![Some(sample), None]);

        assert!(source.next_sample().await.unwrap().is_some());
        assert!(source.next_sample().await.unwrap().is_none());
        // Exhausted sources keep returning None rather than erroring.
        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn drift_source_never_rises_above_rest() {
        let mut source = DriftSource::new(240.0, 25.0, 8);
        for _ in 0..20 {
            let sample = source.next_sample().await.unwrap().unwrap();
            let y = sample.shoulder_y().unwrap();
            assert!(y >= 240.0 - f32::EPSILON);
            assert!(y <= 240.0 + 25.0 + f32::EPSILON);
        }
    }
}
