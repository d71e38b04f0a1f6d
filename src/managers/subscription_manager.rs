//! Change Feed Subscription Manager for LinkVault.
//!
//! Owns the single live feed subscription for the signed-in user. Identity
//! changes are serialized: the previous subscription is fully torn down
//! (pump stopped, feed released) before the next one is opened, so two
//! subscriptions never coexist. The delta handler can be swapped at any time
//! without touching the subscription.
//!
//! Missed events during a disconnect are not recovered here; a full refetch
//! by the application is the recovery path.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::change_feed::{ChangeFeed, ChangeHandler};
use crate::types::change::ChangeEvent;
use crate::types::errors::FeedError;
use crate::types::session::Session;

type SharedHandler = Arc<RwLock<Arc<dyn ChangeHandler>>>;

struct ActiveSubscription {
    user_id: String,
    subscription_id: String,
    pump: JoinHandle<()>,
}

/// Keeps at most one feed subscription alive, bound to the current session.
pub struct SubscriptionManager {
    feed: Arc<dyn ChangeFeed>,
    handler: SharedHandler,
    active: Mutex<Option<ActiveSubscription>>,
}

impl SubscriptionManager {
    pub fn new(feed: Arc<dyn ChangeFeed>, handler: Arc<dyn ChangeHandler>) -> Self {
        Self {
            feed,
            handler: Arc::new(RwLock::new(handler)),
            active: Mutex::new(None),
        }
    }

    /// Replaces the delta handler. The live subscription is left untouched.
    pub fn set_handler(&self, handler: Arc<dyn ChangeHandler>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Binds the subscription to `session`.
    ///
    /// Same user as now: no-op. Different user or `None`: the current
    /// subscription is torn down first, then (for `Some`) a new one is opened.
    /// Concurrent calls queue behind each other; the last one wins.
    pub async fn set_session(&self, session: Option<&Session>) -> Result<(), FeedError> {
        let mut active = self.active.lock().await;

        let requested = session.map(|s| s.user_id.as_str());
        if (*active).as_ref().map(|a| a.user_id.as_str()) == requested {
            return Ok(());
        }

        if let Some(previous) = active.take() {
            self.teardown(previous).await;
        }

        let Some(session) = session else {
            return Ok(());
        };

        let subscription = self.feed.subscribe(session).await?;
        info!(
            user = %session.user_id,
            subscription = %subscription.id,
            "change feed subscribed"
        );

        let pump = tokio::spawn(pump_payloads(subscription.payloads, Arc::clone(&self.handler)));
        *active = Some(ActiveSubscription {
            user_id: session.user_id.clone(),
            subscription_id: subscription.id,
            pump,
        });
        Ok(())
    }

    /// Tears down the live subscription, if any.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            self.teardown(previous).await;
        }
    }

    /// User the live subscription belongs to.
    pub async fn active_user(&self) -> Option<String> {
        let active = self.active.lock().await;
        (*active).as_ref().map(|a| a.user_id.clone())
    }

    /// Feed-assigned ID of the live subscription.
    pub async fn active_subscription_id(&self) -> Option<String> {
        let active = self.active.lock().await;
        (*active).as_ref().map(|a| a.subscription_id.clone())
    }

    async fn teardown(&self, previous: ActiveSubscription) {
        previous.pump.abort();
        // Cancelled or finished, either way nothing more reaches the handler.
        let _ = previous.pump.await;

        if let Err(e) = self.feed.unsubscribe(&previous.subscription_id).await {
            warn!(
                subscription = %previous.subscription_id,
                error = %e,
                "change feed unsubscribe failed"
            );
        }
        info!(
            user = %previous.user_id,
            subscription = %previous.subscription_id,
            "change feed released"
        );
    }
}

/// Parses payloads and hands valid deltas to the current handler.
/// Malformed payloads are dropped.
async fn pump_payloads(mut payloads: mpsc::Receiver<String>, handler: SharedHandler) {
    while let Some(payload) = payloads.recv().await {
        let Some(delta) = ChangeEvent::parse(&payload).and_then(ChangeEvent::into_delta) else {
            debug!(payload = %payload, "dropping unrecognized change payload");
            continue;
        };

        let current = Arc::clone(&*handler.read().unwrap_or_else(PoisonError::into_inner));
        current.on_change(delta);
    }
    debug!("change feed stream ended");
}
