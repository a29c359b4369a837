use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PostureStatus {
    Good,
    Bad,
    Unknown,
}

impl PostureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureStatus::Good => "Good",
            PostureStatus::Bad => "Bad",
            PostureStatus::Unknown => "Unknown",
        }
    }
}

/// Outcome of evaluating one pose sample.
///
/// `status` re-emits on every sample; `alert` fires only on a Bad evaluation
/// outside the cooldown window. The asymmetry is deliberate: the host keeps
/// rendering "slouching" continuously while sounds/notifications stay
/// throttled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostureEvent {
    pub status: PostureStatus,
    pub alert: bool,
}

impl PostureEvent {
    pub fn unknown() -> Self {
        Self {
            status: PostureStatus::Unknown,
            alert: false,
        }
    }
}

/// All mutable monitor state, owned by one `PostureMonitor` and mutated only
/// through its operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    /// Calibrated "good posture" shoulder height. Absent until the first
    /// successful calibration; overwritten by each one after that.
    pub baseline: Option<f32>,
    pub tracking: bool,
    pub last_alert_at: Option<DateTime<Utc>>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            baseline: None,
            tracking: false,
            last_alert_at: None,
        }
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }
}
