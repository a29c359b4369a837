//! Posture monitoring around a calibrated shoulder baseline.
//!
//! The evaluation core ([`monitor::PostureMonitor`]) is pure and
//! clock-agnostic; everything around it — the pose source, the sampling loop,
//! the warning tone, session persistence — is pluggable host plumbing.

pub mod alerts;
pub mod config;
pub mod db;
pub mod models;
pub mod monitor;
pub mod pose;
pub mod settings;
pub mod utils;

pub use alerts::{AlertEngineHandle, LogNotifier, Notifier, SilentNotifier};
pub use config::MonitorConfig;
pub use db::Database;
pub use models::{MonitorSession, PostureReading, SessionStatus};
pub use monitor::{
    recover_interrupted_sessions, CalibrationError, MonitorController, MonitorEvent,
    PostureEvent, PostureMonitor, PostureStatus,
};
pub use pose::{DriftSource, Keypoint, KeypointKind, PoseSample, PoseSource, ReplaySource};
pub use settings::{AlertSettings, SettingsStore};
