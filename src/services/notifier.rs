//! Side channel for user-visible notifications (toasts).
//!
//! The store reports remote failures here instead of returning errors, so
//! failures never escape past the store boundary.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::types::notification::{Notification, NotificationLevel};

/// Receives notifications destined for the presentation layer.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to an unbounded channel the UI drains.
pub struct ChannelNotifier {
    tx: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Creates the notifier and the receiving end for the presentation layer.
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            // Receiver dropped: nobody is displaying toasts anymore.
            warn!("notification receiver closed");
        }
    }
}

/// Writes notifications to the log only. Used when no UI is attached.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => warn!(message = %notification.message, "notification"),
            NotificationLevel::Info => info!(message = %notification.message, "notification"),
        }
    }
}
