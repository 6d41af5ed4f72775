//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! SQLite has no row-level locks. Every write transaction therefore starts with a write statement (see
//! [`users::lock_balance`] and [`rentals::lock_rental`]), which takes the database write lock up front instead of
//! upgrading a read lock half-way through the transaction.
use std::env;

use log::info;
use rental_common::helpers::redact_url_credentials;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod books;
pub mod copies;
pub mod ledger;
pub mod rentals;
pub mod topups;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/rentals.db";

pub fn db_url() -> String {
    let result = env::var("RENTAL_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ RENTAL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {}", redact_url_credentials(&result));
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
