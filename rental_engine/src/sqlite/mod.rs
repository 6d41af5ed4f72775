//! SQLite backend for the rental engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::{SqliteDatabase, SqliteTransaction};
