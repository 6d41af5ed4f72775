use chrono::{DateTime, Utc};
use log::*;
use sqlx::PgConnection;

use crate::{
    db_rows::{convert_all, CopyRow},
    db_types::{BookCopy, CopyStatus},
    traits::StoreError,
};

pub async fn insert_copies(book_id: i64, count: u32, conn: &mut PgConnection) -> Result<Vec<BookCopy>, StoreError> {
    let rows = sqlx::query_as::<_, CopyRow>(
        r#"INSERT INTO book_copies (book_id, status)
        SELECT $1, 'AVAILABLE' FROM generate_series(1, $2)
        RETURNING id, book_id, status, booked_until"#,
    )
    .bind(book_id)
    .bind(i64::from(count))
    .fetch_all(conn)
    .await?;
    debug!("🗃️ {count} copies added to book #{book_id}");
    convert_all(rows)
}

pub async fn fetch_copy(copy_id: i64, conn: &mut PgConnection) -> Result<Option<BookCopy>, StoreError> {
    let row = sqlx::query_as::<_, CopyRow>("SELECT id, book_id, status, booked_until FROM book_copies WHERE id = $1")
        .bind(copy_id)
        .fetch_optional(conn)
        .await?;
    row.map(BookCopy::try_from).transpose()
}

pub async fn copies_for_book(book_id: i64, conn: &mut PgConnection) -> Result<Vec<BookCopy>, StoreError> {
    let rows = sqlx::query_as::<_, CopyRow>(
        "SELECT id, book_id, status, booked_until FROM book_copies WHERE book_id = $1 ORDER BY id",
    )
    .bind(book_id)
    .fetch_all(conn)
    .await?;
    convert_all(rows)
}

/// Locks one AVAILABLE copy, skipping copies that other transactions have already locked, and moves it to
/// `status`. Concurrent claims for the same book never wait on each other.
pub async fn claim_available_copy(
    book_id: i64,
    status: CopyStatus,
    booked_until: Option<DateTime<Utc>>,
    conn: &mut PgConnection,
) -> Result<Option<i64>, StoreError> {
    let copy_id = sqlx::query_scalar::<_, i64>(
        r#"SELECT id FROM book_copies WHERE book_id = $1 AND status = 'AVAILABLE'
        ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED"#,
    )
    .bind(book_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(copy_id) = copy_id else {
        return Ok(None);
    };
    set_copy_status(copy_id, status, booked_until, conn).await?;
    debug!("🗃️ Copy #{copy_id} of book #{book_id} claimed as {status}");
    Ok(Some(copy_id))
}

pub async fn set_copy_status(
    copy_id: i64,
    status: CopyStatus,
    booked_until: Option<DateTime<Utc>>,
    conn: &mut PgConnection,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE book_copies SET status = $2, booked_until = $3 WHERE id = $1")
        .bind(copy_id)
        .bind(status.to_string())
        .bind(booked_until)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::MissingRecord(format!("copy #{copy_id}")));
    }
    Ok(())
}

pub async fn release_expired_holds(now: DateTime<Utc>, conn: &mut PgConnection) -> Result<Vec<i64>, StoreError> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"UPDATE book_copies SET status = 'AVAILABLE', booked_until = NULL
        WHERE status = 'BOOKED' AND booked_until IS NOT NULL AND booked_until < $1
        RETURNING id"#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}
