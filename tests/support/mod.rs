//! Shared fixtures for the LinkVault integration tests.
//!
//! Each test target pulls this in with `#[path = "../support/mod.rs"]`, so
//! not every helper is used by every target.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use linkvault::managers::bookmark_manager::BookmarkManager;
use linkvault::managers::reconciliation_store::ReconciliationStore;
use linkvault::services::change_feed::{ChangeFeed, ChangeHandler, FeedSubscription};
use linkvault::services::local_backend::{LocalBackend, LocalClient};
use linkvault::services::notifier::Notifier;
use linkvault::services::remote_service::RemoteDataService;
use linkvault::types::bookmark::BookmarkItem;
use linkvault::types::change::ChangeDelta;
use linkvault::types::collection::Collection;
use linkvault::types::errors::{FeedError, RemoteError};
use linkvault::types::notification::Notification;
use linkvault::types::session::Session;

pub fn bookmark(id: &str, created_at: i64) -> BookmarkItem {
    BookmarkItem {
        id: id.to_string(),
        url: format!("{}.example/page", id),
        title: format!("Bookmark {}", id),
        collection_id: None,
        collection_name: None,
        archived: false,
        created_at,
    }
}

pub fn bookmark_in(id: &str, created_at: i64, collection: &Collection) -> BookmarkItem {
    BookmarkItem {
        collection_id: Some(collection.id.clone()),
        collection_name: Some(collection.name.clone()),
        ..bookmark(id, created_at)
    }
}

pub fn collection(id: &str, created_at: i64) -> Collection {
    Collection {
        id: id.to_string(),
        name: format!("Collection {}", id),
        created_at,
    }
}

/// Keeps every notification for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Records every delta it receives.
#[derive(Default)]
pub struct RecordingHandler {
    deltas: Mutex<Vec<ChangeDelta>>,
}

impl RecordingHandler {
    pub fn deltas(&self) -> Vec<ChangeDelta> {
        self.deltas.lock().unwrap().clone()
    }
}

impl ChangeHandler for RecordingHandler {
    fn on_change(&self, delta: ChangeDelta) {
        self.deltas.lock().unwrap().push(delta);
    }
}

/// Wraps a [`LocalClient`] with scripted failures and an optional gate that
/// holds every call until the test releases a permit.
pub struct TestRemote {
    inner: LocalClient,
    failing: Mutex<HashSet<&'static str>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl TestRemote {
    pub fn new(inner: LocalClient) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn gated(inner: LocalClient, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(inner)
        }
    }

    /// Makes every later call to `op` fail with a network error.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, op: &'static str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.failing.lock().unwrap().contains(op) {
            return Err(RemoteError::Network("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDataService for TestRemote {
    async fn list_bookmarks(&self) -> Result<Vec<BookmarkItem>, RemoteError> {
        self.enter("list_bookmarks").await?;
        self.inner.list_bookmarks().await
    }

    async fn create_bookmark(
        &self,
        url: &str,
        title: &str,
        collection_id: Option<&str>,
    ) -> Result<BookmarkItem, RemoteError> {
        self.enter("create_bookmark").await?;
        self.inner.create_bookmark(url, title, collection_id).await
    }

    async fn update_bookmark(&self, id: &str, url: &str, title: &str) -> Result<BookmarkItem, RemoteError> {
        self.enter("update_bookmark").await?;
        self.inner.update_bookmark(id, url, title).await
    }

    async fn set_bookmark_collection(&self, id: &str, collection_id: Option<&str>) -> Result<(), RemoteError> {
        self.enter("set_bookmark_collection").await?;
        self.inner.set_bookmark_collection(id, collection_id).await
    }

    async fn archive_bookmark(&self, id: &str, archived: bool) -> Result<(), RemoteError> {
        self.enter("archive_bookmark").await?;
        self.inner.archive_bookmark(id, archived).await
    }

    async fn delete_bookmark(&self, id: &str) -> Result<(), RemoteError> {
        self.enter("delete_bookmark").await?;
        self.inner.delete_bookmark(id).await
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError> {
        self.enter("list_collections").await?;
        self.inner.list_collections().await
    }

    async fn create_collection(&self, name: &str) -> Result<Collection, RemoteError> {
        self.enter("create_collection").await?;
        self.inner.create_collection(name).await
    }

    async fn rename_collection(&self, id: &str, name: &str) -> Result<Collection, RemoteError> {
        self.enter("rename_collection").await?;
        self.inner.rename_collection(id, name).await
    }

    async fn delete_collection(&self, id: &str) -> Result<(), RemoteError> {
        self.enter("delete_collection").await?;
        self.inner.delete_collection(id).await
    }
}

/// A feed whose subscriptions hand out pre-scripted payloads.
#[derive(Default)]
pub struct ScriptedFeed {
    script: Mutex<Vec<String>>,
    open: Mutex<HashSet<String>>,
    opened: AtomicUsize,
    senders: Mutex<Vec<mpsc::Sender<String>>>,
}

impl ScriptedFeed {
    pub fn with_payloads(payloads: Vec<String>) -> Self {
        Self {
            script: Mutex::new(payloads),
            ..Self::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    pub fn total_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for ScriptedFeed {
    async fn subscribe(&self, session: &Session) -> Result<FeedSubscription, FeedError> {
        let script: Vec<String> = self.script.lock().unwrap().drain(..).collect();
        let (tx, payloads) = mpsc::channel(script.len().max(1));
        for payload in script {
            tx.try_send(payload).unwrap();
        }
        // Keep the sender alive so the stream stays open.
        self.senders.lock().unwrap().push(tx);

        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        let id = format!("scripted-{}-{}", session.user_id, n);
        self.open.lock().unwrap().insert(id.clone());
        Ok(FeedSubscription { id, payloads })
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), FeedError> {
        if self.open.lock().unwrap().remove(subscription_id) {
            Ok(())
        } else {
            Err(FeedError::UnknownSubscription(subscription_id.to_string()))
        }
    }
}

/// Everything a manager-level test needs, wired against an in-memory backend.
pub struct Fixture {
    pub backend: Arc<LocalBackend>,
    pub session: Session,
    pub remote: Arc<TestRemote>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<ReconciliationStore>,
    pub manager: BookmarkManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self::build(Some(gate))
    }

    fn build(gate: Option<Arc<Semaphore>>) -> Self {
        let backend = Arc::new(LocalBackend::open_in_memory().expect("Failed to open in-memory backend"));
        let session = Session::new("user-a");
        let client = backend.client(&session);
        let remote = Arc::new(match gate {
            Some(gate) => TestRemote::gated(client, gate),
            None => TestRemote::new(client),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(ReconciliationStore::new(notifier.clone()));
        let manager = BookmarkManager::new(store.clone(), remote.clone());
        Self {
            backend,
            session,
            remote,
            notifier,
            store,
            manager,
        }
    }

    /// A second client for the same user, as another device would use.
    pub fn other_device(&self) -> LocalClient {
        self.backend.client(&self.session)
    }
}

/// Polls `condition` until it holds or a second has passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
