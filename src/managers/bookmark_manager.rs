//! Bookmark Manager for LinkVault.
//!
//! Implements `BookmarkManagerTrait`: the user actions behind the UI. Each
//! action validates against the visible snapshot, applies its optimistic
//! effect through the reconciliation store, and issues the remote write.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::managers::reconciliation_store::{
    Confirmed, MutationOutcome, OptimisticMutation, ReconciliationStore, StoreSnapshot,
};
use crate::managers::temp_id::{is_temp_id, TempId};
use crate::services::remote_service::RemoteDataService;
use crate::types::bookmark::{derive_title, display_url, normalize_for_storage, BookmarkItem};
use crate::types::collection::Collection;
use crate::types::entity;
use crate::types::errors::{BookmarkError, RemoteError};

const SAVE_BOOKMARK: &str = "save bookmark";
const UPDATE_BOOKMARK: &str = "update bookmark";
const ARCHIVE_BOOKMARK: &str = "archive bookmark";
const MOVE_BOOKMARK: &str = "update collection";
const DELETE_BOOKMARK: &str = "delete bookmark";
const CREATE_COLLECTION: &str = "create collection";
const RENAME_COLLECTION: &str = "rename collection";
const DELETE_COLLECTION: &str = "delete collection";

/// User-facing bookmark and collection actions.
#[async_trait]
pub trait BookmarkManagerTrait {
    /// Full refetch of both sets; the recovery path after missed feed events.
    async fn refresh(&self) -> Result<(), RemoteError>;
    async fn add_bookmark(&self, url: &str, title: &str, collection_id: Option<&str>) -> MutationOutcome;
    async fn edit_bookmark(&self, id: &str, url: &str, title: &str) -> MutationOutcome;
    async fn toggle_archive(&self, id: &str) -> MutationOutcome;
    async fn set_collection(&self, id: &str, collection_id: Option<&str>) -> MutationOutcome;
    async fn remove_bookmark(&self, id: &str) -> MutationOutcome;
    async fn create_collection(&self, name: &str) -> MutationOutcome;
    async fn rename_collection(&self, id: &str, name: &str) -> MutationOutcome;
    async fn delete_collection(&self, id: &str) -> MutationOutcome;
}

/// Drives optimistic actions against a store and a remote service.
pub struct BookmarkManager {
    store: Arc<ReconciliationStore>,
    remote: Arc<dyn RemoteDataService>,
}

impl BookmarkManager {
    pub fn new(store: Arc<ReconciliationStore>, remote: Arc<dyn RemoteDataService>) -> Self {
        Self { store, remote }
    }

    pub fn store(&self) -> &Arc<ReconciliationStore> {
        &self.store
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// The bookmark must be visible and already confirmed by the backend.
    fn writable_bookmark(snapshot: &StoreSnapshot, id: &str) -> Result<BookmarkItem, BookmarkError> {
        if is_temp_id(id) {
            return Err(BookmarkError::PendingConfirmation(id.to_string()));
        }
        snapshot
            .bookmark(id)
            .cloned()
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))
    }

    /// The collection must be visible and already confirmed by the backend.
    fn writable_collection(snapshot: &StoreSnapshot, id: &str) -> Result<Collection, BookmarkError> {
        if is_temp_id(id) {
            return Err(BookmarkError::PendingConfirmation(id.to_string()));
        }
        snapshot
            .collection(id)
            .cloned()
            .ok_or_else(|| BookmarkError::CollectionNotFound(id.to_string()))
    }
}

#[async_trait]
impl BookmarkManagerTrait for BookmarkManager {
    async fn refresh(&self) -> Result<(), RemoteError> {
        let token = self.store.begin_refetch();
        let fetched = tokio::try_join!(self.remote.list_bookmarks(), self.remote.list_collections());
        match fetched {
            Ok((bookmarks, collections)) => {
                info!(
                    bookmarks = bookmarks.len(),
                    collections = collections.len(),
                    "refetched bookmarks and collections"
                );
                self.store.apply_refetch(token, bookmarks, collections);
                Ok(())
            }
            Err(e) => {
                self.store.cancel_refetch(token);
                warn!(error = %e, "refetch failed");
                Err(e)
            }
        }
    }

    /// Shows a placeholder with a temporary ID right away; the confirmed
    /// bookmark replaces it once the backend answers.
    async fn add_bookmark(
        &self,
        url: &str,
        title: &str,
        collection_id: Option<&str>,
    ) -> MutationOutcome {
        let url = url.trim();
        if url.is_empty() {
            return self.store.reject(SAVE_BOOKMARK, BookmarkError::EmptyUrl);
        }

        let snapshot = self.store.snapshot();
        let collection_name = match collection_id {
            Some(cid) => match Self::writable_collection(&snapshot, cid) {
                Ok(c) => Some(c.name),
                Err(e) => return self.store.reject(SAVE_BOOKMARK, e),
            },
            None => None,
        };

        let temp_id = TempId::generate();
        let placeholder = BookmarkItem {
            id: temp_id.to_string(),
            url: display_url(url),
            title: derive_title(url, title),
            collection_id: collection_id.map(str::to_string),
            collection_name,
            archived: false,
            created_at: Self::now(),
        };

        let mutation = OptimisticMutation::new(SAVE_BOOKMARK, move |s| {
            entity::insert_unique(&mut s.bookmarks, placeholder.clone());
        })
        .with_temp_id(temp_id);

        let remote = Arc::clone(&self.remote);
        let (url, title) = (url.to_string(), title.to_string());
        let collection_id = collection_id.map(str::to_string);
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .create_bookmark(&url, &title, collection_id.as_deref())
                    .await
                    .map(Confirmed::Bookmark)
            })
            .await
    }

    async fn edit_bookmark(&self, id: &str, url: &str, title: &str) -> MutationOutcome {
        let url = url.trim();
        if url.is_empty() {
            return self.store.reject(UPDATE_BOOKMARK, BookmarkError::EmptyUrl);
        }
        if let Err(e) = Self::writable_bookmark(&self.store.snapshot(), id) {
            return self.store.reject(UPDATE_BOOKMARK, e);
        }

        let (target, shown_url, shown_title) =
            (id.to_string(), display_url(url), derive_title(url, title));
        let mutation = OptimisticMutation::new(UPDATE_BOOKMARK, move |s| {
            s.update_bookmark(&target, |b| {
                b.url = shown_url.clone();
                b.title = shown_title.clone();
            });
        });

        let remote = Arc::clone(&self.remote);
        let (id, url, title) = (id.to_string(), normalize_for_storage(url), title.to_string());
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .update_bookmark(&id, &url, &title)
                    .await
                    .map(Confirmed::Bookmark)
            })
            .await
    }

    async fn toggle_archive(&self, id: &str) -> MutationOutcome {
        let current = match Self::writable_bookmark(&self.store.snapshot(), id) {
            Ok(b) => b,
            Err(e) => return self.store.reject(ARCHIVE_BOOKMARK, e),
        };
        let archived = !current.archived;

        let target = id.to_string();
        let mutation = OptimisticMutation::new(ARCHIVE_BOOKMARK, move |s| {
            s.update_bookmark(&target, |b| b.archived = archived);
        });

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .archive_bookmark(&id, archived)
                    .await
                    .map(|_| Confirmed::Applied)
            })
            .await
    }

    async fn set_collection(&self, id: &str, collection_id: Option<&str>) -> MutationOutcome {
        let snapshot = self.store.snapshot();
        if let Err(e) = Self::writable_bookmark(&snapshot, id) {
            return self.store.reject(MOVE_BOOKMARK, e);
        }
        let collection_name = match collection_id {
            Some(cid) => match Self::writable_collection(&snapshot, cid) {
                Ok(c) => Some(c.name),
                Err(e) => return self.store.reject(MOVE_BOOKMARK, e),
            },
            None => None,
        };

        let target = id.to_string();
        let new_collection = collection_id.map(str::to_string);
        let mutation = OptimisticMutation::new(MOVE_BOOKMARK, move |s| {
            s.update_bookmark(&target, |b| {
                b.collection_id = new_collection.clone();
                b.collection_name = collection_name.clone();
            });
        });

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        let collection_id = collection_id.map(str::to_string);
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .set_bookmark_collection(&id, collection_id.as_deref())
                    .await
                    .map(|_| Confirmed::Applied)
            })
            .await
    }

    async fn remove_bookmark(&self, id: &str) -> MutationOutcome {
        if let Err(e) = Self::writable_bookmark(&self.store.snapshot(), id) {
            return self.store.reject(DELETE_BOOKMARK, e);
        }

        let target = id.to_string();
        let mutation = OptimisticMutation::new(DELETE_BOOKMARK, move |s| {
            entity::remove_by_id(&mut s.bookmarks, &target);
        });

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .delete_bookmark(&id)
                    .await
                    .map(|_| Confirmed::BookmarkDeleted(id))
            })
            .await
    }

    async fn create_collection(&self, name: &str) -> MutationOutcome {
        let name = name.trim();
        if name.is_empty() {
            return self.store.reject(CREATE_COLLECTION, BookmarkError::EmptyName);
        }

        let temp_id = TempId::generate();
        let placeholder = Collection {
            id: temp_id.to_string(),
            name: name.to_string(),
            created_at: Self::now(),
        };
        let mutation = OptimisticMutation::new(CREATE_COLLECTION, move |s| {
            entity::insert_unique(&mut s.collections, placeholder.clone());
        })
        .with_temp_id(temp_id);

        let remote = Arc::clone(&self.remote);
        let name = name.to_string();
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .create_collection(&name)
                    .await
                    .map(Confirmed::Collection)
            })
            .await
    }

    async fn rename_collection(&self, id: &str, name: &str) -> MutationOutcome {
        let name = name.trim();
        if name.is_empty() {
            return self.store.reject(RENAME_COLLECTION, BookmarkError::EmptyName);
        }
        let renamed = match Self::writable_collection(&self.store.snapshot(), id) {
            Ok(c) => Collection {
                name: name.to_string(),
                ..c
            },
            Err(e) => return self.store.reject(RENAME_COLLECTION, e),
        };

        let mutation = OptimisticMutation::new(RENAME_COLLECTION, move |s| {
            if entity::replace_in_place(&mut s.collections, renamed.clone()) {
                s.rename_collection_refs(&renamed);
            }
        });

        let remote = Arc::clone(&self.remote);
        let (id, name) = (id.to_string(), name.to_string());
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .rename_collection(&id, &name)
                    .await
                    .map(Confirmed::Collection)
            })
            .await
    }

    /// Removes the collection and detaches its bookmarks in one step.
    async fn delete_collection(&self, id: &str) -> MutationOutcome {
        if let Err(e) = Self::writable_collection(&self.store.snapshot(), id) {
            return self.store.reject(DELETE_COLLECTION, e);
        }

        let target = id.to_string();
        let mutation = OptimisticMutation::new(DELETE_COLLECTION, move |s| {
            entity::remove_by_id(&mut s.collections, &target);
            s.detach_collection_refs(&target);
        });

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        self.store
            .apply_optimistic_mutation(mutation, || async move {
                remote
                    .delete_collection(&id)
                    .await
                    .map(|_| Confirmed::CollectionDeleted(id))
            })
            .await
    }
}
