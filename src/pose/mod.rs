pub mod keypoint;
pub mod source;

pub use keypoint::{Keypoint, KeypointKind, PoseSample};
pub use source::{DriftSource, PoseSource, ReplaySource};
