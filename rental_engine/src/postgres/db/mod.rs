//! # Postgres Database methods
//!
//! "Low-level" Postgres interactions, written as free functions over a `&mut PgConnection` in the same way as the
//! SQLite module. Postgres has real row locks, so balances and rentals are locked with `SELECT ... FOR UPDATE`, and
//! copies are claimed with `FOR UPDATE SKIP LOCKED`.
use std::env;

use log::info;
use rental_common::helpers::redact_url_credentials;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};

pub mod books;
pub mod copies;
pub mod ledger;
pub mod rentals;
pub mod topups;
pub mod users;

const PG_DB_URL: &str = "postgres://localhost/rentals";

pub fn db_url() -> String {
    let result = env::var("RENTAL_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ RENTAL_DATABASE_URL is not set. Using the default.");
        PG_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {}", redact_url_credentials(&result));
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, SqlxError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
