//! Change feed payloads.
//!
//! The feed delivers JSON text of the shape
//! `{"entityKind", "eventKind", "identifier", "fullEntity"?}`. Payloads are
//! parsed leniently: anything the store cannot act on becomes `None` and is
//! dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bookmark::{BookmarkItem, BookmarkRecord};
use super::collection::Collection;
use super::entity::EntityKind;
use crate::managers::temp_id;

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Insert,
    Update,
    Delete,
}

/// A raw change notification as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub entity_kind: EntityKind,
    pub event_kind: EventKind,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_entity: Option<Value>,
}

/// A validated, typed change ready to be merged.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeDelta {
    BookmarkInserted(BookmarkItem),
    BookmarkUpdated(BookmarkItem),
    BookmarkDeleted(String),
    CollectionInserted(Collection),
    CollectionUpdated(Collection),
    CollectionDeleted(String),
}

impl ChangeEvent {
    /// Builds a bookmark event carrying the full row.
    pub fn bookmark(event_kind: EventKind, record: &BookmarkRecord) -> Self {
        Self {
            entity_kind: EntityKind::Bookmark,
            event_kind,
            identifier: record.id.clone(),
            full_entity: serde_json::to_value(record).ok(),
        }
    }

    /// Builds a collection event carrying the full row.
    pub fn collection(event_kind: EventKind, collection: &Collection) -> Self {
        Self {
            entity_kind: EntityKind::Collection,
            event_kind,
            identifier: collection.id.clone(),
            full_entity: serde_json::to_value(collection).ok(),
        }
    }

    /// Builds a delete event, which carries only the identifier.
    pub fn deleted(entity_kind: EntityKind, identifier: impl Into<String>) -> Self {
        Self {
            entity_kind,
            event_kind: EventKind::Delete,
            identifier: identifier.into(),
            full_entity: None,
        }
    }

    /// Parses a JSON payload. Returns `None` if it is not a change event.
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }

    /// Serializes the event to its JSON wire form.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Validates the event and converts it into a typed delta.
    ///
    /// Returns `None` for identifiers in the temporary namespace, for
    /// insert/update events without a parsable entity, and for entities whose
    /// ID disagrees with `identifier`.
    pub fn into_delta(self) -> Option<ChangeDelta> {
        if self.identifier.is_empty() || temp_id::is_temp_id(&self.identifier) {
            return None;
        }

        match (self.entity_kind, self.event_kind) {
            (EntityKind::Bookmark, EventKind::Delete) => {
                Some(ChangeDelta::BookmarkDeleted(self.identifier))
            }
            (EntityKind::Collection, EventKind::Delete) => {
                Some(ChangeDelta::CollectionDeleted(self.identifier))
            }
            (EntityKind::Bookmark, kind) => {
                let record: BookmarkRecord = serde_json::from_value(self.full_entity?).ok()?;
                if record.id != self.identifier {
                    return None;
                }
                let item = BookmarkItem::from_record(record);
                Some(match kind {
                    EventKind::Insert => ChangeDelta::BookmarkInserted(item),
                    _ => ChangeDelta::BookmarkUpdated(item),
                })
            }
            (EntityKind::Collection, kind) => {
                let collection: Collection = serde_json::from_value(self.full_entity?).ok()?;
                if collection.id != self.identifier {
                    return None;
                }
                Some(match kind {
                    EventKind::Insert => ChangeDelta::CollectionInserted(collection),
                    _ => ChangeDelta::CollectionUpdated(collection),
                })
            }
        }
    }
}

impl ChangeDelta {
    /// Identifier of the entity this delta touches.
    pub fn identifier(&self) -> &str {
        match self {
            ChangeDelta::BookmarkInserted(b) | ChangeDelta::BookmarkUpdated(b) => &b.id,
            ChangeDelta::CollectionInserted(c) | ChangeDelta::CollectionUpdated(c) => &c.id,
            ChangeDelta::BookmarkDeleted(id) | ChangeDelta::CollectionDeleted(id) => id,
        }
    }
}
