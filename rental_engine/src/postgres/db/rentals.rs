use chrono::{DateTime, Utc};
use log::*;
use sqlx::PgConnection;

use crate::{
    db_rows::{convert_all, HistoryRow, RentalRow, RENTAL_COLUMNS},
    db_types::{NewRental, Rental, RentalStatus},
    traits::{HistoryEntry, StoreError},
};

pub async fn insert_rental(rental: NewRental, conn: &mut PgConnection) -> Result<Rental, StoreError> {
    let status = rental.initial_status();
    let paid_at = (status == RentalStatus::Active).then_some(rental.booked_at);
    let q = format!(
        r#"INSERT INTO rentals (user_id, book_id, copy_id, status, rental_cost, booked_at, payment_due_at, paid_at,
            activated_at, external_invoice_id, payment_link)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $10)
        RETURNING {RENTAL_COLUMNS}"#
    );
    let row = sqlx::query_as::<_, RentalRow>(&q)
        .bind(rental.user_id)
        .bind(rental.book_id)
        .bind(rental.copy_id)
        .bind(status.to_string())
        .bind(rental.rental_cost)
        .bind(rental.booked_at)
        .bind(rental.payment_due_at)
        .bind(paid_at)
        .bind(rental.invoice_id())
        .bind(rental.payment_link())
        .fetch_one(conn)
        .await?;
    let rental = Rental::try_from(row)?;
    debug!("🗃️ Rental #{} for copy #{} saved as {}", rental.id, rental.copy_id, rental.status);
    Ok(rental)
}

pub async fn fetch_rental(rental_id: i64, conn: &mut PgConnection) -> Result<Option<Rental>, StoreError> {
    let q = format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1");
    let row = sqlx::query_as::<_, RentalRow>(&q).bind(rental_id).fetch_optional(conn).await?;
    row.map(Rental::try_from).transpose()
}

pub async fn lock_rental(rental_id: i64, conn: &mut PgConnection) -> Result<Option<Rental>, StoreError> {
    let q = format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, RentalRow>(&q).bind(rental_id).fetch_optional(conn).await?;
    row.map(Rental::try_from).transpose()
}

pub async fn fetch_rental_by_invoice(
    invoice_id: &str,
    conn: &mut PgConnection,
) -> Result<Option<Rental>, StoreError> {
    let q = format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE external_invoice_id = $1");
    let row = sqlx::query_as::<_, RentalRow>(&q).bind(invoice_id).fetch_optional(conn).await?;
    row.map(Rental::try_from).transpose()
}

pub async fn activate_rental(
    rental_id: i64,
    at: DateTime<Utc>,
    conn: &mut PgConnection,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "UPDATE rentals SET status = 'ACTIVE', paid_at = $2, activated_at = $2 WHERE id = $1 AND status = 'BOOKED'",
    )
    .bind(rental_id)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_returned(rental_id: i64, at: DateTime<Utc>, conn: &mut PgConnection) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE rentals SET status = 'RETURNED', returned_at = $2 WHERE id = $1")
        .bind(rental_id)
        .bind(at)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::MissingRecord(format!("rental #{rental_id}")));
    }
    Ok(())
}

pub async fn cancel_overdue(now: DateTime<Utc>, conn: &mut PgConnection) -> Result<Vec<Rental>, StoreError> {
    let q = format!(
        r#"UPDATE rentals SET status = 'CANCELED', canceled_at = $1
        WHERE status = 'BOOKED' AND payment_due_at < $1
        RETURNING {RENTAL_COLUMNS}"#
    );
    let rows = sqlx::query_as::<_, RentalRow>(&q).bind(now).fetch_all(conn).await?;
    convert_all(rows)
}

pub async fn history_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<HistoryEntry>, StoreError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"SELECT
            r.id             AS rental_id,
            r.book_id        AS book_id,
            b.name           AS book_name,
            r.copy_id        AS copy_id,
            r.rental_cost    AS price,
            r.status         AS status,
            r.booked_at      AS booked_at,
            r.payment_due_at AS payment_due_at,
            r.activated_at   AS activated_at,
            r.returned_at    AS returned_at,
            r.canceled_at    AS canceled_at
        FROM rentals r JOIN books b ON b.id = r.book_id
        WHERE r.user_id = $1
        ORDER BY r.booked_at DESC, r.id DESC"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    convert_all(rows)
}
