//! Raw row shapes shared by the SQL backends. Status columns are stored as text and parsed on the way out, so that a
//! bad value surfaces as a [`StoreError::DecodeError`] instead of a panic.
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{
    db_types::{BookCopy, LedgerEntry, LedgerRef, Money, Rental, WalletTopup},
    traits::{HistoryEntry, StoreError},
};

pub(crate) const RENTAL_COLUMNS: &str = "id, user_id, book_id, copy_id, status, rental_cost, booked_at, payment_due_at, \
                                         paid_at, activated_at, returned_at, canceled_at, external_invoice_id, \
                                         payment_link";

pub(crate) const TOPUP_COLUMNS: &str =
    "id, user_id, amount, status, external_invoice_id, payment_link, expires_at, paid_at, created_at";

pub(crate) const LEDGER_COLUMNS: &str =
    "id, user_id, ref_table, ref_id, entry_type, amount, balance_after, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct CopyRow {
    id: i64,
    book_id: i64,
    status: String,
    booked_until: Option<DateTime<Utc>>,
}

impl TryFrom<CopyRow> for BookCopy {
    type Error = StoreError;

    fn try_from(row: CopyRow) -> Result<Self, Self::Error> {
        Ok(BookCopy { id: row.id, book_id: row.book_id, status: row.status.parse()?, booked_until: row.booked_until })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RentalRow {
    id: i64,
    user_id: i64,
    book_id: i64,
    copy_id: i64,
    status: String,
    rental_cost: Money,
    booked_at: DateTime<Utc>,
    payment_due_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    external_invoice_id: Option<String>,
    payment_link: Option<String>,
}

impl TryFrom<RentalRow> for Rental {
    type Error = StoreError;

    fn try_from(row: RentalRow) -> Result<Self, Self::Error> {
        Ok(Rental {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            copy_id: row.copy_id,
            status: row.status.parse()?,
            rental_cost: row.rental_cost,
            booked_at: row.booked_at,
            payment_due_at: row.payment_due_at,
            paid_at: row.paid_at,
            activated_at: row.activated_at,
            returned_at: row.returned_at,
            canceled_at: row.canceled_at,
            external_invoice_id: row.external_invoice_id,
            payment_link: row.payment_link,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct LedgerRow {
    id: i64,
    user_id: i64,
    ref_table: String,
    ref_id: Option<i64>,
    entry_type: String,
    amount: Money,
    balance_after: Money,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.id,
            user_id: row.user_id,
            reference: LedgerRef::from_parts(&row.ref_table, row.ref_id)?,
            entry_type: row.entry_type.parse()?,
            amount: row.amount,
            balance_after: row.balance_after,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TopupRow {
    id: i64,
    user_id: i64,
    amount: Money,
    status: String,
    external_invoice_id: String,
    payment_link: String,
    expires_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TopupRow> for WalletTopup {
    type Error = StoreError;

    fn try_from(row: TopupRow) -> Result<Self, Self::Error> {
        Ok(WalletTopup {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            status: row.status.parse()?,
            external_invoice_id: row.external_invoice_id,
            payment_link: row.payment_link,
            expires_at: row.expires_at,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct HistoryRow {
    rental_id: i64,
    book_id: i64,
    book_name: String,
    copy_id: i64,
    price: Money,
    status: String,
    booked_at: DateTime<Utc>,
    payment_due_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            rental_id: row.rental_id,
            book_id: row.book_id,
            book_name: row.book_name,
            copy_id: row.copy_id,
            price: row.price,
            status: row.status.parse()?,
            booked_at: row.booked_at,
            payment_due_at: row.payment_due_at,
            activated_at: row.activated_at,
            returned_at: row.returned_at,
            canceled_at: row.canceled_at,
        })
    }
}

/// Converts a batch of raw rows, failing on the first row that cannot be decoded.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where T: TryFrom<R, Error = StoreError> {
    rows.into_iter().map(T::try_from).collect()
}
