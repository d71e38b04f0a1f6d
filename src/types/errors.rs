use std::fmt;

// === RemoteError ===

/// Errors returned by the remote data service.
///
/// The reconciliation store treats every variant identically (roll back and
/// notify); the distinction only matters for logs and messages.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The request never reached the service or the response was lost.
    Network(String),
    /// The session is missing, expired, or not allowed to touch the row.
    Unauthorized(String),
    /// The service rejected the payload.
    Validation(String),
    /// No row with the given ID is visible to the session.
    NotFound(String),
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Network(msg) => write!(f, "Network error: {}", msg),
            RemoteError::Unauthorized(msg) => write!(f, "Not authorized: {}", msg),
            RemoteError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            RemoteError::NotFound(id) => write!(f, "Record not found: {}", id),
            RemoteError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Backend(e.to_string())
    }
}

// === FeedError ===

/// Errors related to the change feed subscription lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Opening the subscription failed.
    SubscribeFailed(String),
    /// Releasing the subscription failed.
    UnsubscribeFailed(String),
    /// The subscription ID is not known to the feed.
    UnknownSubscription(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::SubscribeFailed(msg) => write!(f, "Change feed subscribe failed: {}", msg),
            FeedError::UnsubscribeFailed(msg) => {
                write!(f, "Change feed unsubscribe failed: {}", msg)
            }
            FeedError::UnknownSubscription(id) => {
                write!(f, "Unknown change feed subscription: {}", id)
            }
        }
    }
}

impl std::error::Error for FeedError {}

// === BookmarkError ===

/// Local validation errors raised before a mutation is attempted.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkError {
    /// Bookmark with the given ID is not in the local set.
    NotFound(String),
    /// Collection with the given ID is not in the local set.
    CollectionNotFound(String),
    /// The entity still carries a temporary ID and cannot be written remotely yet.
    PendingConfirmation(String),
    /// The URL is empty.
    EmptyUrl,
    /// The collection name is empty.
    EmptyName,
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            BookmarkError::CollectionNotFound(id) => write!(f, "Collection not found: {}", id),
            BookmarkError::PendingConfirmation(id) => {
                write!(f, "Still saving, try again in a moment: {}", id)
            }
            BookmarkError::EmptyUrl => write!(f, "URL cannot be empty"),
            BookmarkError::EmptyName => write!(f, "Collection name cannot be empty"),
        }
    }
}

impl std::error::Error for BookmarkError {}

// === SettingsError ===

/// Errors related to settings operations.
#[derive(Debug)]
pub enum SettingsError {
    /// File I/O error when reading or writing settings.
    IoError(String),
    /// JSON serialization or deserialization error.
    SerializationError(String),
    /// The specified settings key does not exist.
    InvalidKey(String),
    /// The provided value is invalid for the setting.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === AppError ===

/// Errors raised while wiring up or starting the application.
#[derive(Debug)]
pub enum AppError {
    /// The local database could not be opened.
    Database(String),
    /// Settings could not be loaded.
    Settings(SettingsError),
    /// The change feed subscription could not be established.
    Feed(FeedError),
    /// The initial fetch failed.
    Remote(RemoteError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Settings(e) => write!(f, "{}", e),
            AppError::Feed(e) => write!(f, "{}", e),
            AppError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(_) => None,
            AppError::Settings(e) => Some(e),
            AppError::Feed(e) => Some(e),
            AppError::Remote(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<SettingsError> for AppError {
    fn from(e: SettingsError) -> Self {
        AppError::Settings(e)
    }
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        AppError::Feed(e)
    }
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        AppError::Remote(e)
    }
}
