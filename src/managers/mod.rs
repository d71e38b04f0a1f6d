// LinkVault state managers
// Managers own client-side state: the reconciliation store, user actions, temporary IDs, and the feed subscription.

pub mod bookmark_manager;
pub mod reconciliation_store;
pub mod subscription_manager;
pub mod temp_id;
