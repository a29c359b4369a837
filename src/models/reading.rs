//! Posture reading data model.
//!
//! One row per evaluated sample: enough to reconstruct how a session went
//! (how long upright, when the slouches happened, which ones alerted).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::PostureStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureReading {
    pub id: Option<i64>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    /// Absent when the sample was non-evaluable (occluded shoulders).
    pub shoulder_y: Option<f32>,
    pub status: PostureStatus,
    pub alerted: bool,
}
