//! Identifier-keyed entity trait shared by bookmarks and collections.
//!
//! The merge algorithm in the reconciliation store is written once against
//! this trait; the only per-kind difference is where a new entity lands.

use serde::{Deserialize, Serialize};

/// The two entity kinds the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Bookmark,
    Collection,
}

/// Where a newly inserted entity is placed in its ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Newest first.
    Front,
    /// Creation order.
    Back,
}

/// An entity with a stable unique identifier.
pub trait Entity: Clone + PartialEq {
    const KIND: EntityKind;
    const PLACEMENT: Placement;

    fn id(&self) -> &str;
}

/// Returns the index of the entity with the given ID.
pub fn position_of<T: Entity>(list: &[T], id: &str) -> Option<usize> {
    list.iter().position(|e| e.id() == id)
}

/// Returns a reference to the entity with the given ID.
pub fn find<'a, T: Entity>(list: &'a [T], id: &str) -> Option<&'a T> {
    list.iter().find(|e| e.id() == id)
}

/// Inserts `entity` according to its placement. Returns `false` (and leaves
/// the list untouched) if an entity with the same ID is already present.
pub fn insert_unique<T: Entity>(list: &mut Vec<T>, entity: T) -> bool {
    if position_of(list, entity.id()).is_some() {
        return false;
    }
    match T::PLACEMENT {
        Placement::Front => list.insert(0, entity),
        Placement::Back => list.push(entity),
    }
    true
}

/// Replaces the entity with the same ID in place. Returns `false` if absent.
pub fn replace_in_place<T: Entity>(list: &mut [T], entity: T) -> bool {
    match position_of(list, entity.id()) {
        Some(idx) => {
            list[idx] = entity;
            true
        }
        None => false,
    }
}

/// Removes the entity with the given ID. Returns the removed entity.
pub fn remove_by_id<T: Entity>(list: &mut Vec<T>, id: &str) -> Option<T> {
    position_of(list, id).map(|idx| list.remove(idx))
}
