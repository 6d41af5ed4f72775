use chrono::Utc;
use log::*;
use sqlx::PgConnection;

use crate::{
    db_rows::{convert_all, LedgerRow, LEDGER_COLUMNS},
    db_types::{LedgerEntry, NewLedgerEntry},
    traits::StoreError,
};

pub async fn append_entry(entry: NewLedgerEntry, conn: &mut PgConnection) -> Result<LedgerEntry, StoreError> {
    let q = format!(
        r#"INSERT INTO wallet_ledger (user_id, ref_table, ref_id, entry_type, amount, balance_after, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {LEDGER_COLUMNS}"#
    );
    let row = sqlx::query_as::<_, LedgerRow>(&q)
        .bind(entry.user_id)
        .bind(entry.reference.table())
        .bind(entry.reference.id())
        .bind(entry.entry_type.to_string())
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
    let entry = LedgerEntry::try_from(row)?;
    debug!(
        "🗃️ Ledger entry #{} for user #{}: {} {} (balance {})",
        entry.id, entry.user_id, entry.entry_type, entry.amount, entry.balance_after
    );
    Ok(entry)
}

/// All ledger entries for the user, newest first.
pub async fn ledger_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<LedgerEntry>, StoreError> {
    let q = format!("SELECT {LEDGER_COLUMNS} FROM wallet_ledger WHERE user_id = $1 ORDER BY id DESC");
    let rows = sqlx::query_as::<_, LedgerRow>(&q).bind(user_id).fetch_all(conn).await?;
    convert_all(rows)
}
