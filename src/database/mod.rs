//! SQLite storage for the bundled local backend.
//!
//! ```no_run
//! use linkvault::database::Database;
//!
//! let db = Database::open("linkvault.db").expect("failed to open database");
//! let scratch = Database::open_in_memory().expect("failed to open in-memory database");
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
