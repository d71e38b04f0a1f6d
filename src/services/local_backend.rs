//! In-process LinkVault backend backed by SQLite.
//!
//! Stands in for the managed database service: [`LocalClient`] answers the
//! remote data operations for one user, and [`LocalBackend`] itself is a
//! [`ChangeFeed`] that pushes every committed write to that user's
//! subscribers as a JSON payload.
//!
//! Deleting a collection detaches its bookmarks in SQL (`ON DELETE SET NULL`)
//! but only the collection delete is announced on the feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::services::change_feed::{ChangeFeed, FeedSubscription};
use crate::services::remote_service::RemoteDataService;
use crate::types::bookmark::{BookmarkItem, BookmarkRecord};
use crate::types::change::{ChangeEvent, EventKind};
use crate::types::collection::Collection;
use crate::types::entity::EntityKind;
use crate::types::errors::{FeedError, RemoteError};
use crate::types::session::Session;

const BROADCAST_CAPACITY: usize = 1024;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

const BOOKMARK_COLUMNS: &str = "b.id, b.user_id, b.collection_id, b.title, b.url, b.is_archived, b.created_at, c.name \
     FROM bookmarks b LEFT JOIN collections c ON c.id = b.collection_id";

#[derive(Debug, Clone)]
struct FeedMessage {
    user_id: String,
    payload: String,
}

/// SQLite-backed stand-in for the managed backend.
pub struct LocalBackend {
    db: Mutex<Database>,
    events: broadcast::Sender<FeedMessage>,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
    channel_capacity: usize,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            db: Mutex::new(db),
            events,
            subscriptions: Mutex::new(HashMap::new()),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Backend over a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Sets the per-subscription buffer size.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// A remote data client whose reads and writes are scoped to `session`.
    pub fn client(self: &Arc<Self>, session: &Session) -> LocalClient {
        LocalClient {
            backend: Arc::clone(self),
            user_id: session.user_id.clone(),
        }
    }

    /// Number of subscriptions currently open.
    pub fn subscription_count(&self) -> usize {
        self.lock_subscriptions().len()
    }

    fn lock_db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn publish(&self, user_id: &str, event: ChangeEvent) {
        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(identifier = %event.identifier, error = %e, "dropping unserializable change event");
                return;
            }
        };
        let message = FeedMessage {
            user_id: user_id.to_string(),
            payload,
        };
        // No receivers just means nobody is subscribed.
        let _ = self.events.send(message);
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BookmarkRecord> {
        Ok(BookmarkRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            collection_id: row.get(2)?,
            title: row.get(3)?,
            url: row.get(4)?,
            is_archived: row.get(5)?,
            created_at: row.get(6)?,
            collection_name: row.get(7)?,
        })
    }

    fn fetch_bookmark(conn: &Connection, user_id: &str, id: &str) -> Result<BookmarkRecord, RemoteError> {
        conn.query_row(
            &format!("SELECT {} WHERE b.id = ?1 AND b.user_id = ?2", BOOKMARK_COLUMNS),
            params![id, user_id],
            Self::row_to_record,
        )
        .optional()?
        .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    fn check_collection(conn: &Connection, user_id: &str, collection_id: Option<&str>) -> Result<(), RemoteError> {
        let Some(cid) = collection_id else {
            return Ok(());
        };
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE id = ?1 AND user_id = ?2",
            params![cid, user_id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(RemoteError::Validation(format!("unknown collection {}", cid)));
        }
        Ok(())
    }

    fn list_bookmarks(&self, user_id: &str) -> Result<Vec<BookmarkItem>, RemoteError> {
        let db = self.lock_db();
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {} WHERE b.user_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC",
            BOOKMARK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], Self::row_to_record)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(BookmarkItem::from_record(row?));
        }
        Ok(results)
    }

    fn create_bookmark(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
        collection_id: Option<&str>,
    ) -> Result<BookmarkItem, RemoteError> {
        if url.trim().is_empty() {
            return Err(RemoteError::Validation("url is required".to_string()));
        }
        let db = self.lock_db();
        let conn = db.connection();
        Self::check_collection(conn, user_id, collection_id)?;

        let id = Uuid::new_v4().to_string();
        let title = if title.is_empty() { None } else { Some(title) };
        conn.execute(
            "INSERT INTO bookmarks (id, user_id, collection_id, title, url, is_archived, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![id, user_id, collection_id, title, url, Self::now()],
        )?;

        let record = Self::fetch_bookmark(conn, user_id, &id)?;
        self.publish(user_id, ChangeEvent::bookmark(EventKind::Insert, &record));
        debug!(%id, "local backend created bookmark");
        Ok(BookmarkItem::from_record(record))
    }

    /// Runs an UPDATE scoped to the user's bookmark, then announces the new row.
    fn update_bookmark_row(
        &self,
        user_id: &str,
        id: &str,
        apply: impl FnOnce(&Connection) -> rusqlite::Result<usize>,
    ) -> Result<BookmarkRecord, RemoteError> {
        let db = self.lock_db();
        let conn = db.connection();
        if apply(conn)? == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        let record = Self::fetch_bookmark(conn, user_id, id)?;
        self.publish(user_id, ChangeEvent::bookmark(EventKind::Update, &record));
        Ok(record)
    }

    fn update_bookmark(&self, user_id: &str, id: &str, url: &str, title: &str) -> Result<BookmarkItem, RemoteError> {
        if url.trim().is_empty() {
            return Err(RemoteError::Validation("url is required".to_string()));
        }
        let title = if title.is_empty() { None } else { Some(title) };
        let record = self.update_bookmark_row(user_id, id, |conn| {
            conn.execute(
                "UPDATE bookmarks SET url = ?1, title = ?2 WHERE id = ?3 AND user_id = ?4",
                params![url, title, id, user_id],
            )
        })?;
        Ok(BookmarkItem::from_record(record))
    }

    fn set_bookmark_collection(&self, user_id: &str, id: &str, collection_id: Option<&str>) -> Result<(), RemoteError> {
        Self::check_collection(self.lock_db().connection(), user_id, collection_id)?;
        self.update_bookmark_row(user_id, id, |conn| {
            conn.execute(
                "UPDATE bookmarks SET collection_id = ?1 WHERE id = ?2 AND user_id = ?3",
                params![collection_id, id, user_id],
            )
        })?;
        Ok(())
    }

    fn archive_bookmark(&self, user_id: &str, id: &str, archived: bool) -> Result<(), RemoteError> {
        self.update_bookmark_row(user_id, id, |conn| {
            conn.execute(
                "UPDATE bookmarks SET is_archived = ?1 WHERE id = ?2 AND user_id = ?3",
                params![archived, id, user_id],
            )
        })?;
        Ok(())
    }

    fn delete_bookmark(&self, user_id: &str, id: &str) -> Result<(), RemoteError> {
        let affected = self.lock_db().connection().execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        self.publish(user_id, ChangeEvent::deleted(EntityKind::Bookmark, id));
        Ok(())
    }

    fn list_collections(&self, user_id: &str) -> Result<Vec<Collection>, RemoteError> {
        let db = self.lock_db();
        let mut stmt = db.connection().prepare(
            "SELECT id, name, created_at FROM collections WHERE user_id = ?1 \
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Collection {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn create_collection(&self, user_id: &str, name: &str) -> Result<Collection, RemoteError> {
        if name.trim().is_empty() {
            return Err(RemoteError::Validation("collection name is required".to_string()));
        }
        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Self::now(),
        };
        self.lock_db().connection().execute(
            "INSERT INTO collections (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection.id, user_id, collection.name, collection.created_at],
        )?;
        self.publish(user_id, ChangeEvent::collection(EventKind::Insert, &collection));
        Ok(collection)
    }

    fn rename_collection(&self, user_id: &str, id: &str, name: &str) -> Result<Collection, RemoteError> {
        if name.trim().is_empty() {
            return Err(RemoteError::Validation("collection name is required".to_string()));
        }
        let db = self.lock_db();
        let conn = db.connection();
        let affected = conn.execute(
            "UPDATE collections SET name = ?1 WHERE id = ?2 AND user_id = ?3",
            params![name, id, user_id],
        )?;
        if affected == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        let collection = conn.query_row(
            "SELECT id, name, created_at FROM collections WHERE id = ?1",
            params![id],
            |row| {
                Ok(Collection {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )?;
        self.publish(user_id, ChangeEvent::collection(EventKind::Update, &collection));
        Ok(collection)
    }

    fn delete_collection(&self, user_id: &str, id: &str) -> Result<(), RemoteError> {
        let affected = self.lock_db().connection().execute(
            "DELETE FROM collections WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        self.publish(user_id, ChangeEvent::deleted(EntityKind::Collection, id));
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for LocalBackend {
    /// Forwards the session user's payloads into a bounded channel.
    /// Payloads dropped by a lagging receiver are lost, as on a real feed.
    async fn subscribe(&self, session: &Session) -> Result<FeedSubscription, FeedError> {
        let mut events = self.events.subscribe();
        let (tx, payloads) = mpsc::channel(self.channel_capacity);
        let user_id = session.user_id.clone();

        let forward = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(message) if message.user_id == user_id => {
                        if tx.send(message.payload).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed subscriber lagged, events lost");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let id = format!("realtime-sync-{}", Uuid::new_v4());
        self.lock_subscriptions().insert(id.clone(), forward);
        Ok(FeedSubscription { id, payloads })
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), FeedError> {
        match self.lock_subscriptions().remove(subscription_id) {
            Some(forward) => {
                forward.abort();
                Ok(())
            }
            None => Err(FeedError::UnknownSubscription(subscription_id.to_string())),
        }
    }
}

/// Remote data client bound to one user of a [`LocalBackend`].
pub struct LocalClient {
    backend: Arc<LocalBackend>,
    user_id: String,
}

#[async_trait]
impl RemoteDataService for LocalClient {
    async fn list_bookmarks(&self) -> Result<Vec<BookmarkItem>, RemoteError> {
        self.backend.list_bookmarks(&self.user_id)
    }

    async fn create_bookmark(
        &self,
        url: &str,
        title: &str,
        collection_id: Option<&str>,
    ) -> Result<BookmarkItem, RemoteError> {
        self.backend
            .create_bookmark(&self.user_id, url, title, collection_id)
    }

    async fn update_bookmark(&self, id: &str, url: &str, title: &str) -> Result<BookmarkItem, RemoteError> {
        self.backend.update_bookmark(&self.user_id, id, url, title)
    }

    async fn set_bookmark_collection(&self, id: &str, collection_id: Option<&str>) -> Result<(), RemoteError> {
        self.backend
            .set_bookmark_collection(&self.user_id, id, collection_id)
    }

    async fn archive_bookmark(&self, id: &str, archived: bool) -> Result<(), RemoteError> {
        self.backend.archive_bookmark(&self.user_id, id, archived)
    }

    async fn delete_bookmark(&self, id: &str) -> Result<(), RemoteError> {
        self.backend.delete_bookmark(&self.user_id, id)
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError> {
        self.backend.list_collections(&self.user_id)
    }

    async fn create_collection(&self, name: &str) -> Result<Collection, RemoteError> {
        self.backend.create_collection(&self.user_id, name)
    }

    async fn rename_collection(&self, id: &str, name: &str) -> Result<Collection, RemoteError> {
        self.backend.rename_collection(&self.user_id, id, name)
    }

    async fn delete_collection(&self, id: &str) -> Result<(), RemoteError> {
        self.backend.delete_collection(&self.user_id, id)
    }
}
