//! Email status state machine with a cancellable auto-reset.
//!
//! `Idle -> Sending -> {Sent | Error} -> Idle`. The return to idle is a
//! delayed task owned by the [`StatusTracker`]; starting a new export aborts
//! the pending reset so a stale timer never clobbers a newer status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Email delivery status shown next to the export control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EmailStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// Rendering or emailing
    Sending,
    /// Delivered
    Sent {
        /// Confirmed recipient
        to: String,
    },
    /// Rendering or delivery failed
    Error {
        /// Human-readable cause
        reason: String,
    },
}

impl EmailStatus {
    /// Whether an export is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, EmailStatus::Sending)
    }

    /// Inline status text (empty when idle).
    pub fn display_text(&self) -> String {
        match self {
            EmailStatus::Idle => String::new(),
            EmailStatus::Sending => "sending...".to_string(),
            EmailStatus::Sent { to } => format!("✅ sent to {}", to),
            EmailStatus::Error { reason } => format!("❌ error: {}", reason),
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// Owner of one status slot.
///
/// Observers subscribe to a watch channel. Terminal states schedule a reset
/// on the ambient tokio runtime.
pub struct StatusTracker {
    sender: Arc<watch::Sender<EmailStatus>>,
    generation: Arc<AtomicU64>,
    reset: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
}

impl StatusTracker {
    /// Create an idle tracker resetting after `delay`.
    pub fn new(delay: Duration) -> Self {
        let (sender, _) = watch::channel(EmailStatus::Idle);
        Self {
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            reset: Mutex::new(None),
            delay,
        }
    }

    /// Current status.
    pub fn current(&self) -> EmailStatus {
        self.sender.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<EmailStatus> {
        self.sender.subscribe()
    }

    /// Enter `Sending`, cancelling any pending reset.
    pub fn begin(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_reset();
        self.sender.send_replace(EmailStatus::Sending);
    }

    /// Enter `Sent` and schedule the reset.
    pub fn finish(&self, to: impl Into<String>) {
        self.settle(EmailStatus::Sent { to: to.into() });
    }

    /// Enter `Error` and schedule the reset.
    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(EmailStatus::Error {
            reason: reason.into(),
        });
    }

    /// Return to `Idle` immediately (nothing was emailed).
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_reset();
        self.sender.send_replace(EmailStatus::Idle);
    }

    fn settle(&self, status: EmailStatus) {
        log::debug!("email status: {:?}", status);
        self.sender.send_replace(status);

        let generation = self.generation.load(Ordering::SeqCst);
        let sender = Arc::clone(&self.sender);
        let current = Arc::clone(&self.generation);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                sender.send_replace(EmailStatus::Idle);
            }
        });

        if let Ok(mut slot) = self.reset.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    fn cancel_reset(&self) {
        if let Ok(mut slot) = self.reset.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for StatusTracker {
    fn drop(&mut self) {
        self.cancel_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        assert_eq!(EmailStatus::Idle.display_text(), "");
        assert_eq!(
            EmailStatus::Sent {
                to: "a@b.com".into()
            }
            .to_string(),
            "✅ sent to a@b.com"
        );
        assert_eq!(
            EmailStatus::Error {
                reason: "HTTP 500".into()
            }
            .to_string(),
            "❌ error: HTTP 500"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_delay() {
        let tracker = StatusTracker::new(Duration::from_secs(6));
        tracker.begin();
        assert!(tracker.current().is_busy());
        tracker.finish("ops@example.com");

        tokio::time::sleep(Duration::from_millis(5900)).await;
        assert_eq!(
            tracker.current(),
            EmailStatus::Sent {
                to: "ops@example.com".into()
            }
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert_eq!(tracker.current(), EmailStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_export_cancels_stale_reset() {
        let tracker = StatusTracker::new(Duration::from_secs(6));
        tracker.begin();
        tracker.fail("HTTP 500");

        tokio::time::sleep(Duration::from_secs(4)).await;
        tracker.begin();
        tracker.finish("ops@example.com");

        // The first reset would have fired at 6 s
        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert!(matches!(tracker.current(), EmailStatus::Sent { .. }));

        tokio::time::sleep(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert_eq!(tracker.current(), EmailStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_transitions() {
        let tracker = StatusTracker::new(Duration::from_secs(1));
        let mut rx = tracker.subscribe();
        tracker.begin();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), EmailStatus::Sending);
        tracker.fail("boom");
        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow_and_update(), EmailStatus::Error { .. }));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), EmailStatus::Idle);
    }
}
