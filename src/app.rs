//! App Core for LinkVault.
//!
//! Wires the reconciliation store, the action layer and the feed
//! subscription for one signed-in session. Every collaborator is handed in by
//! the host, so nothing here reaches for process-wide state.

use std::sync::Arc;

use tracing::info;

use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::reconciliation_store::{ReconciliationStore, StoreSnapshot};
use crate::managers::subscription_manager::SubscriptionManager;
use crate::services::change_feed::{ChangeFeed, ChangeHandler};
use crate::services::notifier::Notifier;
use crate::services::remote_service::RemoteDataService;
use crate::types::errors::AppError;
use crate::types::session::Session;
use crate::types::settings::LinkVaultSettings;

/// Central application struct for one authenticated session.
pub struct App {
    pub settings: LinkVaultSettings,
    pub session: Session,
    pub store: Arc<ReconciliationStore>,
    pub bookmarks: BookmarkManager,
    pub subscriptions: SubscriptionManager,
}

impl App {
    /// Builds the app from injected collaborators. Nothing is fetched or
    /// subscribed until [`start`](Self::start).
    pub fn new(
        settings: LinkVaultSettings,
        session: Session,
        remote: Arc<dyn RemoteDataService>,
        feed: Arc<dyn ChangeFeed>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(
            ReconciliationStore::new(notifier)
                .with_failure_prefix(settings.notifications.failure_prefix.clone()),
        );
        let handler: Arc<dyn ChangeHandler> = store.clone();
        let subscriptions = SubscriptionManager::new(feed, handler);
        let bookmarks = BookmarkManager::new(Arc::clone(&store), remote);

        Self {
            settings,
            session,
            store,
            bookmarks,
            subscriptions,
        }
    }

    /// Subscribes to the change feed, then loads the full state.
    ///
    /// Subscribing first means writes committed during the initial fetch
    /// are still delivered. The store keeps whatever the feed merged after
    /// the fetch started, so a slower list response cannot undo it.
    pub async fn start(&self) -> Result<(), AppError> {
        self.subscriptions.set_session(Some(&self.session)).await?;
        self.bookmarks.refresh().await?;
        info!(user = %self.session.user_id, "session started");
        Ok(())
    }

    /// Releases the subscription and clears the local sets, tombstones
    /// included.
    pub async fn shutdown(&self) {
        self.subscriptions.shutdown().await;
        self.store.clear();
        info!(user = %self.session.user_id, "session ended");
    }

    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.store.snapshot()
    }
}
