//! SQLite bootstrap for the local key-value store.
//!
//! Connections come back migrated; failures surface as
//! `RepoError::Sqlite` or `RepoError::SchemaTooNew`.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
