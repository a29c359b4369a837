//! Notification boundary.
//!
//! Desktop notification delivery is platform glue the host owns; the sampling
//! loop only talks to this trait. `LogNotifier` is the built-in fallback so a
//! headless run still surfaces alerts somewhere visible.

use log::warn;

pub trait Notifier: Send + Sync {
    /// Called once per emitted alert, already rate-limited by the monitor's
    /// cooldown. Delivery failures are the implementation's problem to log.
    fn notify(&self, title: &str, body: &str);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        warn!("{title}: {body}");
    }
}

/// Used when the user has switched notifications off; the warning tone and
/// status events still fire.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub struct RecordingNotifier {
        pub messages: Arc<Mutex<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, _body: &str) {
            self.messages.lock().unwrap().push(title.to_string());
        }
    }

    #[test]
    fn notifier_trait_is_object_safe() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let notifier: Box<dyn Notifier> = Box::new(RecordingNotifier {
            messages: Arc::clone(&messages),
        });
        notifier.notify("Fix your posture!", "Straighten your back");
        assert_eq!(messages.lock().unwrap().len(), 1);
    }
}
