//! User-facing notifications ("toasts").

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

/// How many notifications are kept at once; older ones are dropped
const MAX_NOTIFICATIONS: usize = 3;

/// How long a notification stays visible
const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Anything that can tell the user something happened.
pub trait Notifier {
    fn notify(&mut self, title: &str, description: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub created: Instant,
}

impl Notification {
    /// "Title: description", or whichever of the two is present
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.description.is_empty()) {
            (false, false) => format!("{}: {}", self.title, self.description),
            (true, _) => self.description.clone(),
            (false, true) => self.title.clone(),
        }
    }
}

/// Bounded queue of notifications that expire after a few seconds.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_at(&mut self, title: &str, description: &str, now: Instant) {
        if self.queue.len() == MAX_NOTIFICATIONS {
            self.queue.pop_front();
        }
        self.queue.push_back(Notification {
            title: title.to_string(),
            description: description.to_string(),
            created: now,
        });
    }

    /// Drop expired notifications. Called once per UI tick.
    pub fn prune(&mut self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&mut self, now: Instant) {
        self.queue
            .retain(|n| now.saturating_duration_since(n.created) < NOTIFICATION_TTL);
    }

    /// Most recent notification, if any is still visible
    pub fn latest(&self) -> Option<&Notification> {
        self.queue.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Notifier for Notifications {
    fn notify(&mut self, title: &str, description: &str) {
        info!(title, description, "Notification");
        self.push_at(title, description, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_bounded() {
        let mut notes = Notifications::new();
        for i in 0..5 {
            notes.notify("Error", &format!("failure {}", i));
        }
        assert_eq!(notes.len(), MAX_NOTIFICATIONS);
        assert_eq!(notes.iter().next().unwrap().description, "failure 2");
        assert_eq!(notes.latest().unwrap().text(), "Error: failure 4");
    }

    #[test]
    fn test_notifications_expire() {
        let mut notes = Notifications::new();
        let start = Instant::now();
        notes.push_at("Saved", "", start);
        notes.push_at("", "later", start + Duration::from_secs(3));

        notes.prune_at(start + Duration::from_secs(4));
        assert_eq!(notes.len(), 2);

        notes.prune_at(start + NOTIFICATION_TTL);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.latest().unwrap().text(), "later");

        notes.prune_at(start + Duration::from_secs(60));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_text_variants() {
        let mut notes = Notifications::new();
        notes.notify("Workout completed", "");
        assert_eq!(notes.latest().unwrap().text(), "Workout completed");
        notes.clear();
        assert!(notes.latest().is_none());
    }
}
