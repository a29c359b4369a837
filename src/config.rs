/// Reference behavior constants: 10px of slack below the calibrated shoulder
/// height, and at most one audible/notification alert per 3 seconds.
pub const DEFAULT_MARGIN: f32 = 10.0;
pub const DEFAULT_ALERT_COOLDOWN_MS: i64 = 3000;

/// Configuration for the posture monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Slack below the baseline before posture counts as degraded (pixels,
    /// same units as keypoint positions).
    pub margin: f32,

    /// Minimum gap between successive alerts. Bad status keeps re-emitting
    /// every sample; only the alert signal is throttled.
    pub alert_cooldown_ms: i64,

    /// Sampling loop period.
    pub sample_interval_ms: u64,

    /// Keypoints scored below this are treated as absent.
    pub min_confidence: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            alert_cooldown_ms: DEFAULT_ALERT_COOLDOWN_MS,
            sample_interval_ms: 500,
            min_confidence: 0.3,
        }
    }
}
