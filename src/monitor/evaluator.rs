//! Posture evaluation core.
//!
//! Pure, clock-agnostic logic: a calibrated baseline, a per-sample threshold
//! comparison, and a cooldown on alert emission. The caller supplies `now`
//! explicitly, so the same code runs under a sampling loop or a test harness
//! identically.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::MonitorConfig;
use crate::pose::PoseSample;

use super::state::{MonitorState, PostureEvent, PostureStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalibrationError {
    /// The sample lacked one or both shoulder landmarks. Recoverable: retry
    /// with a later sample.
    #[error("calibration sample is missing shoulder keypoints")]
    MissingKeypoints,
}

pub struct PostureMonitor {
    state: MonitorState,
    config: MonitorConfig,
}

impl PostureMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            state: MonitorState::new(),
            config,
        }
    }

    pub fn baseline(&self) -> Option<f32> {
        self.state.baseline
    }

    pub fn is_tracking(&self) -> bool {
        self.state.tracking
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Record the current shoulder height as the good-posture reference.
    /// Legal at any time, tracking or not; each success overwrites the
    /// previous baseline and a failure leaves it untouched.
    pub fn calibrate(&mut self, sample: &PoseSample) -> Result<f32, CalibrationError> {
        let baseline = sample
            .shoulder_y()
            .ok_or(CalibrationError::MissingKeypoints)?;
        self.state.baseline = Some(baseline);
        Ok(baseline)
    }

    /// Idempotent: starting while already tracking is a no-op. A baseline is
    /// not required to start; evaluation without one just reports Unknown.
    pub fn start_tracking(&mut self) {
        self.state.tracking = true;
    }

    pub fn stop_tracking(&mut self) {
        self.state.tracking = false;
    }

    /// Evaluate one sample against the baseline.
    ///
    /// Never fails: tracking off, missing shoulders, and no-baseline all
    /// degrade to `Unknown` with no state mutation, since one frame of
    /// occlusion must not interrupt the monitoring loop. Callers must deliver
    /// samples in non-decreasing `now` order; the cooldown math assumes it.
    pub fn observe(&mut self, sample: &PoseSample, now: DateTime<Utc>) -> PostureEvent {
        if !self.state.tracking {
            return PostureEvent::unknown();
        }

        let Some(current_y) = sample.shoulder_y() else {
            return PostureEvent::unknown();
        };

        let Some(baseline) = self.state.baseline else {
            return PostureEvent::unknown();
        };

        if current_y > baseline + self.config.margin {
            let alert = self.cooldown_elapsed(now);
            if alert {
                self.state.last_alert_at = Some(now);
            }
            PostureEvent {
                status: PostureStatus::Bad,
                alert,
            }
        } else {
            PostureEvent {
                status: PostureStatus::Good,
                alert: false,
            }
        }
    }

    // Boundary inclusive: an alert exactly cooldown_ms after the last one
    // fires again. The very first bad posture always alerts.
    fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.state.last_alert_at {
            Some(last) => now - last >= Duration::milliseconds(self.config.alert_cooldown_ms),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointKind, PoseSample};
    use chrono::TimeZone;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn shoulders(left_y: f32, right_y: f32) -> PoseSample {
        PoseSample::new(
            vec![
                Keypoint::new(KeypointKind::LeftShoulder, 220.0, left_y, 0.9),
                Keypoint::new(KeypointKind::RightShoulder, 420.0, right_y, 0.9),
            ],
            at_ms(0),
        )
    }

    fn one_shoulder(y: f32) -> PoseSample {
        PoseSample::new(
            vec![Keypoint::new(KeypointKind::LeftShoulder, 220.0, y, 0.9)],
            at_ms(0),
        )
    }

    fn calibrated_monitor(baseline: f32) -> PostureMonitor {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        monitor
            .calibrate(&shoulders(baseline, baseline))
            .expect("calibration");
        monitor.start_tracking();
        monitor
    }

    #[test]
    fn calibrate_averages_shoulder_heights() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        let baseline = monitor.calibrate(&shoulders(200.0, 210.0)).unwrap();
        assert_eq!(baseline, 205.0);
        assert_eq!(monitor.baseline(), Some(205.0));
    }

    #[test]
    fn calibrate_fails_without_both_shoulders_and_keeps_prior_baseline() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        monitor.calibrate(&shoulders(200.0, 200.0)).unwrap();

        let err = monitor.calibrate(&one_shoulder(300.0)).unwrap_err();
        assert_eq!(err, CalibrationError::MissingKeypoints);
        assert_eq!(monitor.baseline(), Some(200.0));
    }

    #[test]
    fn recalibration_overwrites_baseline() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        monitor.calibrate(&shoulders(200.0, 200.0)).unwrap();
        monitor.calibrate(&shoulders(240.0, 240.0)).unwrap();
        assert_eq!(monitor.baseline(), Some(240.0));
    }

    #[test]
    fn tracking_toggles_are_idempotent() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());

        monitor.start_tracking();
        monitor.start_tracking();
        assert!(monitor.is_tracking());

        monitor.stop_tracking();
        monitor.stop_tracking();
        assert!(!monitor.is_tracking());
    }

    #[test]
    fn observe_at_baseline_is_good() {
        let mut monitor = calibrated_monitor(200.0);
        let event = monitor.observe(&shoulders(200.0, 200.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Good);
        assert!(!event.alert);
    }

    #[test]
    fn observe_exactly_at_margin_is_still_good() {
        let mut monitor = calibrated_monitor(200.0);
        let event = monitor.observe(&shoulders(210.0, 210.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Good);
    }

    #[test]
    fn observe_past_margin_is_bad_and_alerts() {
        let mut monitor = calibrated_monitor(200.0);
        let event = monitor.observe(&shoulders(211.0, 211.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Bad);
        assert!(event.alert);
        assert_eq!(monitor.state().last_alert_at, Some(at_ms(0)));
    }

    #[test]
    fn alert_suppressed_within_cooldown_but_status_stays_bad() {
        let mut monitor = calibrated_monitor(200.0);
        let slouched = shoulders(211.0, 211.0);

        let first = monitor.observe(&slouched, at_ms(0));
        assert!(first.alert);

        let second = monitor.observe(&slouched, at_ms(1000));
        assert_eq!(second.status, PostureStatus::Bad);
        assert!(!second.alert);
        assert_eq!(monitor.state().last_alert_at, Some(at_ms(0)));

        // Cooldown boundary is inclusive.
        let third = monitor.observe(&slouched, at_ms(3000));
        assert_eq!(third.status, PostureStatus::Bad);
        assert!(third.alert);
        assert_eq!(monitor.state().last_alert_at, Some(at_ms(3000)));
    }

    #[test]
    fn observe_without_baseline_is_unknown() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        monitor.start_tracking();
        let event = monitor.observe(&shoulders(100.0, 100.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Unknown);
        assert!(!event.alert);
    }

    #[test]
    fn observe_while_idle_is_unknown_and_mutates_nothing() {
        let mut monitor = PostureMonitor::new(MonitorConfig::default());
        monitor.calibrate(&shoulders(200.0, 200.0)).unwrap();

        let event = monitor.observe(&shoulders(300.0, 300.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Unknown);
        assert!(monitor.state().last_alert_at.is_none());
    }

    #[test]
    fn observe_with_one_shoulder_is_unknown_and_mutates_nothing() {
        let mut monitor = calibrated_monitor(200.0);
        let event = monitor.observe(&one_shoulder(300.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Unknown);
        assert!(monitor.state().last_alert_at.is_none());
    }

    #[test]
    fn good_posture_between_slouches_does_not_reset_cooldown() {
        let mut monitor = calibrated_monitor(200.0);
        let slouched = shoulders(211.0, 211.0);

        assert!(monitor.observe(&slouched, at_ms(0)).alert);
        let upright = monitor.observe(&shoulders(200.0, 200.0), at_ms(1000));
        assert_eq!(upright.status, PostureStatus::Good);

        // Back to slouching inside the window: still no second alert.
        assert!(!monitor.observe(&slouched, at_ms(2000)).alert);
        assert!(monitor.observe(&slouched, at_ms(3000)).alert);
    }

    #[test]
    fn calibrate_is_legal_while_tracking() {
        let mut monitor = calibrated_monitor(200.0);
        monitor.calibrate(&shoulders(220.0, 220.0)).unwrap();
        assert!(monitor.is_tracking());
        assert_eq!(monitor.baseline(), Some(220.0));

        // The old slouch height is within margin of the new baseline.
        let event = monitor.observe(&shoulders(211.0, 211.0), at_ms(0));
        assert_eq!(event.status, PostureStatus::Good);
    }
}
