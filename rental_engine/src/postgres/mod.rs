//! Postgres backend for the rental engine.
mod postgres_impl;

pub mod db;
pub use postgres_impl::{PostgresDatabase, PostgresTransaction};
