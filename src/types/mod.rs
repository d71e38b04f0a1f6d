// LinkVault shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod change;
pub mod collection;
pub mod entity;
pub mod errors;
pub mod notification;
pub mod session;
pub mod settings;
