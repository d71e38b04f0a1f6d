//! LinkVault: a personal bookmark manager core.
//!
//! Keeps a local, optimistically mutated view of bookmarks and collections
//! consistent with remote writes and a live change feed. This library crate
//! exposes all modules for use by the demo binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
