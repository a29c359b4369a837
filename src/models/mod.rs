pub mod reading;
pub mod session;

pub use reading::PostureReading;
pub use session::{MonitorSession, SessionStatus};
