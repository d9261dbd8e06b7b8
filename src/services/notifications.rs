//! Fire-and-forget user notifications. At most one notification is visible
//! at a time; a later `notify` replaces the earlier one.

use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

/// Reading speed the auto-hide heuristic assumes.
const WORDS_PER_MINUTE: u64 = 200;
/// Extra time on top of the raw reading time.
const READING_TIME_FACTOR: u32 = 2;
/// Shortest auto-hide delay, so one-word messages stay legible.
const MIN_AUTO_HIDE: Duration = Duration::from_secs(2);

/// A single user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Distinguishes consecutive notifications with identical text.
    pub id: Uuid,
    /// Message shown to the user.
    pub message: String,
    /// How long the notification should stay visible.
    pub auto_hide: Duration,
}

/// Replace-on-notify channel feeding the presentation layer.
pub struct Notifier {
    current: watch::Sender<Option<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            current: watch::channel(None).0,
        }
    }
}

impl Notifier {
    /// Notifier with nothing visible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message`, replacing any currently visible notification.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        let _ = self.current.send(Some(Notification {
            id: Uuid::new_v4(),
            auto_hide: auto_hide_for(&message),
            message,
        }));
    }

    /// Dismiss the visible notification, if any.
    pub fn dismiss(&self) {
        let _ = self.current.send(None);
    }

    /// Observe the visible notification.
    pub fn watcher(&self) -> watch::Receiver<Option<Notification>> {
        self.current.subscribe()
    }
}

/// Auto-hide delay derived from an estimated reading time of the message.
fn auto_hide_for(message: &str) -> Duration {
    let words = message.split_whitespace().count().max(1) as u64;
    let reading = Duration::from_millis(words * 60_000 / WORDS_PER_MINUTE);
    (reading * READING_TIME_FACTOR).max(MIN_AUTO_HIDE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_notification_replaces_earlier() {
        let notifier = Notifier::new();
        let watcher = notifier.watcher();

        notifier.notify("first");
        notifier.notify("second");

        let visible = watcher.borrow().clone().unwrap();
        assert_eq!(visible.message, "second");
    }

    #[test]
    fn identical_messages_are_distinguishable() {
        let notifier = Notifier::new();
        let watcher = notifier.watcher();

        notifier.notify("boom");
        let first = watcher.borrow().clone().unwrap();
        notifier.notify("boom");
        let second = watcher.borrow().clone().unwrap();

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn dismiss_clears_the_channel() {
        let notifier = Notifier::new();
        let watcher = notifier.watcher();

        notifier.notify("gone soon");
        notifier.dismiss();

        assert!(watcher.borrow().is_none());
    }

    #[test]
    fn auto_hide_grows_with_message_length_and_has_a_floor() {
        let short = auto_hide_for("ok");
        let long = auto_hide_for(&"word ".repeat(100));

        assert_eq!(short, Duration::from_secs(2));
        assert!(long > short);
    }
}
