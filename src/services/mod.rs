// LinkVault services
// Services are the collaborators behind traits: remote data, change feed, the local backend, notifications, settings.

pub mod change_feed;
pub mod local_backend;
pub mod notifier;
pub mod remote_service;
pub mod settings_engine;
