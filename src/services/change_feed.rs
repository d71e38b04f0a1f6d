//! Change Feed contract.
//!
//! A feed pushes JSON change payloads for the rows of one authenticated
//! session. Delivery is at-least-once while connected, unordered, and lossy
//! across disconnects.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::change::ChangeDelta;
use crate::types::errors::FeedError;
use crate::types::session::Session;

/// An open subscription: its feed-assigned ID and the payload stream.
pub struct FeedSubscription {
    pub id: String,
    pub payloads: mpsc::Receiver<String>,
}

/// Source of change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a subscription scoped to `session`.
    async fn subscribe(&self, session: &Session) -> Result<FeedSubscription, FeedError>;

    /// Releases a subscription. After this returns no more payloads are sent.
    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), FeedError>;
}

/// Receives validated deltas from the subscription manager.
pub trait ChangeHandler: Send + Sync {
    fn on_change(&self, delta: ChangeDelta);
}
