//! Remote Data Service contract.
//!
//! Request/response CRUD for bookmarks and collections against the managed
//! backend. Every call may fail; callers treat all failures alike.

use async_trait::async_trait;

use crate::types::bookmark::BookmarkItem;
use crate::types::collection::Collection;
use crate::types::errors::RemoteError;

/// Operations the backend offers to an authenticated session.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// All bookmarks of the session, newest first, with collection names resolved.
    async fn list_bookmarks(&self) -> Result<Vec<BookmarkItem>, RemoteError>;

    /// Creates a bookmark. An empty title is stored as absent.
    async fn create_bookmark(
        &self,
        url: &str,
        title: &str,
        collection_id: Option<&str>,
    ) -> Result<BookmarkItem, RemoteError>;

    async fn update_bookmark(
        &self,
        id: &str,
        url: &str,
        title: &str,
    ) -> Result<BookmarkItem, RemoteError>;

    async fn set_bookmark_collection(
        &self,
        id: &str,
        collection_id: Option<&str>,
    ) -> Result<(), RemoteError>;

    async fn archive_bookmark(&self, id: &str, archived: bool) -> Result<(), RemoteError>;

    async fn delete_bookmark(&self, id: &str) -> Result<(), RemoteError>;

    /// All collections of the session in creation order.
    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError>;

    async fn create_collection(&self, name: &str) -> Result<Collection, RemoteError>;

    async fn rename_collection(&self, id: &str, name: &str) -> Result<Collection, RemoteError>;

    async fn delete_collection(&self, id: &str) -> Result<(), RemoteError>;
}
