pub mod controller;
pub mod evaluator;
mod loop_worker;
pub mod state;

pub use controller::{
    recover_interrupted_sessions, MonitorController, MonitorEvent, MonitorSnapshot,
};
pub use evaluator::{CalibrationError, PostureMonitor};
pub use state::{MonitorState, PostureEvent, PostureStatus};
