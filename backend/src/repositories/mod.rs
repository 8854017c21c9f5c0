//! Store adapters for users and refresh tokens.
//!
//! The rotation service only ever sees the [`UserStore`] trait; the SQLite
//! implementation is the production store and the in-memory one backs tests
//! and demos. Both honor the same atomicity contract on rotation.

pub mod memory_store;
pub mod sqlite_store;
pub mod user_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use user_store::{InsertUserOutcome, ResetOutcome, RotationOutcome, UserStore};
