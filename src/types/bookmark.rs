use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind, Placement};

/// A bookmark row as stored by the backend and carried on the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: i64,
    /// Name of the referenced collection, resolved by the backend.
    #[serde(default)]
    pub collection_name: Option<String>,
}

/// A bookmark as held by the reconciliation store and shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkItem {
    pub id: String,
    /// Display form of the URL (scheme removed).
    pub url: String,
    pub title: String,
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
    pub archived: bool,
    pub created_at: i64,
}

impl BookmarkItem {
    /// Maps a backend row to its display shape.
    ///
    /// An empty or missing title falls back to the URL's host.
    pub fn from_record(record: BookmarkRecord) -> Self {
        let title = match record.title {
            Some(t) if !t.is_empty() => t,
            _ => derive_host(&record.url),
        };
        Self {
            id: record.id,
            url: display_url(&record.url),
            title,
            collection_id: record.collection_id,
            collection_name: record.collection_name,
            archived: record.is_archived,
            created_at: record.created_at,
        }
    }

    /// Host part of the bookmark URL.
    pub fn host(&self) -> String {
        derive_host(&self.url)
    }

    /// Favicon service URL for this bookmark's host.
    pub fn favicon_url(&self) -> String {
        format!(
            "https://www.google.com/s2/favicons?domain={}&sz=32",
            self.host()
        )
    }

    /// Clears the collection reference ("uncategorized").
    pub fn detach_collection(&mut self) {
        self.collection_id = None;
        self.collection_name = None;
    }
}

impl Entity for BookmarkItem {
    const KIND: EntityKind = EntityKind::Bookmark;
    const PLACEMENT: Placement = Placement::Front;

    fn id(&self) -> &str {
        &self.id
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Removes a leading `http://` or `https://`.
pub fn display_url(url: &str) -> String {
    strip_scheme(url).to_string()
}

/// Returns the host of `url`: scheme removed, cut at the first `/`.
/// Falls back to the whole input when that leaves nothing.
pub fn derive_host(url: &str) -> String {
    let host = strip_scheme(url).split('/').next().unwrap_or_default();
    if host.is_empty() {
        url.to_string()
    } else {
        host.to_string()
    }
}

/// Title shown for a bookmark: the given title, or the host when empty.
pub fn derive_title(url: &str, title: &str) -> String {
    if title.is_empty() {
        derive_host(url)
    } else {
        title.to_string()
    }
}

/// Storage form of an edited URL: anything not starting with `http` gets `https://`.
pub fn normalize_for_storage(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
