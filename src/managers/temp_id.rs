//! Temporary identifiers for entities created locally before the backend
//! assigns a permanent one.
//!
//! Temporary IDs live in their own `temp-` namespace. Backend IDs never carry
//! that prefix, so a feed event for a permanent ID can never match a
//! placeholder, and feed events naming a temporary ID are discarded.

use std::fmt;

use uuid::Uuid;

/// Prefix reserved for locally generated placeholder IDs.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// A locally generated placeholder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempId(String);

impl TempId {
    /// Generates a fresh, collision-resistant temporary ID.
    pub fn generate() -> Self {
        Self(format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TempId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if `id` belongs to the temporary namespace.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
