use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind, Placement};

/// A named group of bookmarks. Names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl Entity for Collection {
    const KIND: EntityKind = EntityKind::Collection;
    const PLACEMENT: Placement = Placement::Back;

    fn id(&self) -> &str {
        &self.id
    }
}
