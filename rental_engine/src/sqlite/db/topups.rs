use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_rows::{convert_all, TopupRow, TOPUP_COLUMNS},
    db_types::{NewTopup, WalletTopup},
    traits::StoreError,
};

pub async fn insert_topup(topup: NewTopup, conn: &mut SqliteConnection) -> Result<WalletTopup, StoreError> {
    let q = format!(
        r#"INSERT INTO wallet_topups (user_id, amount, status, external_invoice_id, payment_link, expires_at, created_at)
        VALUES ($1, $2, 'PENDING', $3, $4, $5, $6)
        RETURNING {TOPUP_COLUMNS}"#
    );
    let row = sqlx::query_as::<_, TopupRow>(&q)
        .bind(topup.user_id)
        .bind(topup.amount)
        .bind(topup.external_invoice_id)
        .bind(topup.payment_link)
        .bind(topup.expires_at)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;
    let topup = WalletTopup::try_from(row)?;
    debug!("🗃️ Top-up #{} of {} for user #{} saved", topup.id, topup.amount, topup.user_id);
    Ok(topup)
}

pub async fn fetch_topup(topup_id: i64, conn: &mut SqliteConnection) -> Result<Option<WalletTopup>, StoreError> {
    let q = format!("SELECT {TOPUP_COLUMNS} FROM wallet_topups WHERE id = $1");
    let row = sqlx::query_as::<_, TopupRow>(&q).bind(topup_id).fetch_optional(conn).await?;
    row.map(WalletTopup::try_from).transpose()
}

pub async fn fetch_topup_by_invoice(
    invoice_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTopup>, StoreError> {
    let q = format!("SELECT {TOPUP_COLUMNS} FROM wallet_topups WHERE external_invoice_id = $1");
    let row = sqlx::query_as::<_, TopupRow>(&q).bind(invoice_id).fetch_optional(conn).await?;
    row.map(WalletTopup::try_from).transpose()
}

pub async fn mark_paid(topup_id: i64, at: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result =
        sqlx::query("UPDATE wallet_topups SET status = 'PAID', paid_at = $2 WHERE id = $1 AND status = 'PENDING'")
            .bind(topup_id)
            .bind(at)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn topups_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<WalletTopup>, StoreError> {
    let q = format!("SELECT {TOPUP_COLUMNS} FROM wallet_topups WHERE user_id = $1 ORDER BY id DESC");
    let rows = sqlx::query_as::<_, TopupRow>(&q).bind(user_id).fetch_all(conn).await?;
    convert_all(rows)
}
