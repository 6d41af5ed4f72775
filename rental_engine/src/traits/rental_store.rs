use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    ConversionError,
    CopyStatus,
    LedgerEntry,
    LedgerEntryType,
    LedgerRef,
    Money,
    NewLedgerEntry,
    NewRental,
    NewTopup,
    Rental,
    WalletTopup,
};

/// This trait defines the highest level of behaviour for backends supporting the rental engine.
///
/// Backends hand out [`StoreTransaction`]s, and answer the lookups that settlement performs before it opens a
/// transaction.
#[allow(async_fn_in_trait)]
pub trait RentalStore: Clone {
    type Tx: StoreTransaction;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Starts a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Idempotency lookup for settlement: the top-up that was issued with the given external invoice id, if any.
    async fn find_topup_by_external_invoice(&self, invoice_id: &str) -> Result<Option<WalletTopup>, StoreError>;

    /// Idempotency lookup for settlement: the rental that was booked with the given external invoice id, if any.
    async fn find_rental_by_external_invoice(&self, invoice_id: &str) -> Result<Option<Rental>, StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A single atomic unit of work against the catalog and ledger stores.
///
/// Lock ordering: whenever an operation touches both a user balance and a copy, [`Self::lock_balance`] is called
/// first. Nothing is visible to other transactions until [`Self::commit`] returns.
#[allow(async_fn_in_trait)]
pub trait StoreTransaction {
    /// Takes an exclusive lock on the user's balance row and returns the balance. Returns `None` if the user does not
    /// exist. Must be called before any balance mutation in the same transaction.
    async fn lock_balance(&mut self, user_id: i64) -> Result<Option<Money>, StoreError>;

    /// Overwrites the cached balance. Only call this through [`Self::post_ledger_entry`], so that the balance and the
    /// ledger never disagree.
    async fn set_balance(&mut self, user_id: i64, balance: Money) -> Result<(), StoreError>;

    /// Appends an entry to the ledger. Entries are never modified or deleted.
    async fn append_ledger_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Applies `amount` to a balance that was read with [`Self::lock_balance`] and records the change in the ledger.
    async fn post_ledger_entry(
        &mut self,
        user_id: i64,
        locked_balance: Money,
        amount: Money,
        entry_type: LedgerEntryType,
        reference: LedgerRef,
    ) -> Result<LedgerEntry, StoreError> {
        let balance_after = locked_balance + amount;
        self.set_balance(user_id, balance_after).await?;
        let entry = NewLedgerEntry { user_id, reference, entry_type, amount, balance_after };
        self.append_ledger_entry(entry).await
    }

    /// The current rental cost of the book, or `None` if the book does not exist.
    async fn book_price(&mut self, book_id: i64) -> Result<Option<Money>, StoreError>;

    /// Claims one AVAILABLE copy of the book and moves it to `status`, skipping copies that concurrent transactions
    /// are busy claiming. Returns the copy id, or `None` when no copy could be obtained.
    async fn claim_available_copy(
        &mut self,
        book_id: i64,
        status: CopyStatus,
        booked_until: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, StoreError>;

    async fn set_copy_status(
        &mut self,
        copy_id: i64,
        status: CopyStatus,
        booked_until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn insert_rental(&mut self, rental: NewRental) -> Result<Rental, StoreError>;

    /// Loads the rental and takes an exclusive lock on it.
    async fn lock_rental(&mut self, rental_id: i64) -> Result<Option<Rental>, StoreError>;

    /// Moves a BOOKED rental to ACTIVE. Returns false, and changes nothing, if the rental was not BOOKED.
    async fn activate_rental(&mut self, rental_id: i64, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn mark_rental_returned(&mut self, rental_id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn insert_topup(&mut self, topup: NewTopup) -> Result<WalletTopup, StoreError>;

    /// Moves a PENDING top-up to PAID. Returns false, and changes nothing, if the top-up was not PENDING. This
    /// conditional update is what makes duplicate callback delivery harmless.
    async fn mark_topup_paid(&mut self, topup_id: i64, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Marks the top-up as paid and credits the user's balance in one step. Returns `None` if the top-up had already
    /// been settled.
    async fn mark_topup_paid_and_credit(
        &mut self,
        topup_id: i64,
        user_id: i64,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        if !self.mark_topup_paid(topup_id, at).await? {
            return Ok(None);
        }
        let balance = self.lock_balance(user_id).await?.ok_or(StoreError::MissingRecord(format!("user #{user_id}")))?;
        let entry = self
            .post_ledger_entry(user_id, balance, amount, LedgerEntryType::TopupConfirmed, LedgerRef::Topup(topup_id))
            .await?;
        Ok(Some(entry))
    }

    /// Moves every BOOKED rental whose payment deadline is before `now` to CANCELED.
    async fn cancel_overdue_rentals(&mut self, now: DateTime<Utc>) -> Result<Vec<Rental>, StoreError>;

    /// Moves every BOOKED copy whose hold expired before `now` back to AVAILABLE, and returns their ids.
    async fn release_expired_holds(&mut self, now: DateTime<Utc>) -> Result<Vec<i64>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("A unique constraint was violated. {0}")]
    AlreadyExists(String),
    #[error("A record that must exist is missing: {0}")]
    MissingRecord(String),
    #[error("Could not decode a stored value. {0}")]
    DecodeError(#[from] ConversionError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(db.message().to_string()),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
