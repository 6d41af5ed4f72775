//! `PostgresDatabase` is the multi-process backend for the rental engine, enabled with the `postgres` feature.
//!
//! It implements the same store traits as the SQLite backend, but relies on Postgres row locks rather than the
//! database-wide write lock, so bookings for different users never serialize on each other.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use rental_common::helpers::redact_url_credentials;
use sqlx::{migrate::MigrateError, Postgres, PgPool, Transaction};

use super::db::{books, copies, db_url, ledger, new_pool, rentals, topups, users};
use crate::{
    db_types::{
        Book,
        BookCopy,
        CopyStatus,
        LedgerEntry,
        Money,
        NewBook,
        NewLedgerEntry,
        NewRental,
        NewTopup,
        NewUser,
        Rental,
        User,
        WalletTopup,
    },
    traits::{AccountManagement, CatalogManagement, HistoryEntry, RentalStore, StoreError, StoreTransaction},
};

#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    /// Creates a new database API object, using `RENTAL_DATABASE_URL` to locate the database.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        PostgresDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {}", redact_url_credentials(url));
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/postgres/migrations").run(&self.pool).await?;
        info!("🗃️ Postgres migrations complete");
        Ok(())
    }
}

impl RentalStore for PostgresDatabase {
    type Tx = PostgresTransaction;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn find_topup_by_external_invoice(&self, invoice_id: &str) -> Result<Option<WalletTopup>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        topups::fetch_topup_by_invoice(invoice_id, &mut conn).await
    }

    async fn find_rental_by_external_invoice(&self, invoice_id: &str) -> Result<Option<Rental>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        rentals::fetch_rental_by_invoice(invoice_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for PostgresDatabase {
    async fn create_book(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut conn = self.pool.acquire().await?;
        books::insert_book(book, &mut conn).await
    }

    async fn add_copies(&self, book_id: i64, count: u32) -> Result<Vec<BookCopy>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if books::book_price(book_id, &mut tx).await?.is_none() {
            return Err(StoreError::MissingRecord(format!("book #{book_id}")));
        }
        let copies = copies::insert_copies(book_id, count, &mut tx).await?;
        tx.commit().await?;
        Ok(copies)
    }

    async fn fetch_book(&self, book_id: i64) -> Result<Option<Book>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        books::fetch_book(book_id, &mut conn).await
    }

    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        books::list_books(&mut conn).await
    }

    async fn fetch_copy(&self, copy_id: i64) -> Result<Option<BookCopy>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        copies::fetch_copy(copy_id, &mut conn).await
    }

    async fn copies_for_book(&self, book_id: i64) -> Result<Vec<BookCopy>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        copies::copies_for_book(book_id, &mut conn).await
    }
}

impl AccountManagement for PostgresDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_email(email, &mut conn).await
    }

    async fn fetch_rental(&self, rental_id: i64) -> Result<Option<Rental>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        rentals::fetch_rental(rental_id, &mut conn).await
    }

    async fn rental_history(&self, user_id: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        rentals::history_for_user(user_id, &mut conn).await
    }

    async fn ledger_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::ledger_for_user(user_id, &mut conn).await
    }

    async fn fetch_topup(&self, topup_id: i64) -> Result<Option<WalletTopup>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        topups::fetch_topup(topup_id, &mut conn).await
    }

    async fn topups_for_user(&self, user_id: i64) -> Result<Vec<WalletTopup>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        topups::topups_for_user(user_id, &mut conn).await
    }
}

/// An open Postgres transaction. Dropping it without calling [`StoreTransaction::commit`] rolls back every change.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl Debug for PostgresTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresTransaction")
    }
}

impl StoreTransaction for PostgresTransaction {
    async fn lock_balance(&mut self, user_id: i64) -> Result<Option<Money>, StoreError> {
        users::lock_balance(user_id, &mut self.tx).await
    }

    async fn set_balance(&mut self, user_id: i64, balance: Money) -> Result<(), StoreError> {
        users::set_balance(user_id, balance, &mut self.tx).await
    }

    async fn append_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        ledger::append_entry(entry, &mut self.tx).await
    }

    async fn book_price(&mut self, book_id: i64) -> Result<Option<Money>, StoreError> {
        books::book_price(book_id, &mut self.tx).await
    }

    async fn claim_available_copy(
        &mut self,
        book_id: i64,
        status: CopyStatus,
        booked_until: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, StoreError> {
        copies::claim_available_copy(book_id, status, booked_until, &mut self.tx).await
    }

    async fn set_copy_status(
        &mut self,
        copy_id: i64,
        status: CopyStatus,
        booked_until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        copies::set_copy_status(copy_id, status, booked_until, &mut self.tx).await
    }

    async fn insert_rental(&mut self, rental: NewRental) -> Result<Rental, StoreError> {
        rentals::insert_rental(rental, &mut self.tx).await
    }

    async fn lock_rental(&mut self, rental_id: i64) -> Result<Option<Rental>, StoreError> {
        rentals::lock_rental(rental_id, &mut self.tx).await
    }

    async fn activate_rental(&mut self, rental_id: i64, at: DateTime<Utc>) -> Result<bool, StoreError> {
        rentals::activate_rental(rental_id, at, &mut self.tx).await
    }

    async fn mark_rental_returned(&mut self, rental_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        rentals::mark_returned(rental_id, at, &mut self.tx).await
    }

    async fn insert_topup(&mut self, topup: NewTopup) -> Result<WalletTopup, StoreError> {
        topups::insert_topup(topup, &mut self.tx).await
    }

    async fn mark_topup_paid(&mut self, topup_id: i64, at: DateTime<Utc>) -> Result<bool, StoreError> {
        topups::mark_paid(topup_id, at, &mut self.tx).await
    }

    async fn cancel_overdue_rentals(&mut self, now: DateTime<Utc>) -> Result<Vec<Rental>, StoreError> {
        rentals::cancel_overdue(now, &mut self.tx).await
    }

    async fn release_expired_holds(&mut self, now: DateTime<Utc>) -> Result<Vec<i64>, StoreError> {
        copies::release_expired_holds(now, &mut self.tx).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
