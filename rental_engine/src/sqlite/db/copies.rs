use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_rows::{convert_all, CopyRow},
    db_types::{BookCopy, CopyStatus},
    traits::StoreError,
};

/// How often a copy claim is retried after losing a compare-and-swap race while copies are still available.
const CLAIM_ATTEMPTS: usize = 5;

pub async fn insert_copies(
    book_id: i64,
    count: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<BookCopy>, StoreError> {
    let mut copies = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let row = sqlx::query_as::<_, CopyRow>(
            "INSERT INTO book_copies (book_id, status) VALUES ($1, 'AVAILABLE') RETURNING id, book_id, status, \
             booked_until",
        )
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;
        copies.push(BookCopy::try_from(row)?);
    }
    debug!("🗃️ {count} copies added to book #{book_id}");
    Ok(copies)
}

pub async fn fetch_copy(copy_id: i64, conn: &mut SqliteConnection) -> Result<Option<BookCopy>, StoreError> {
    let row = sqlx::query_as::<_, CopyRow>("SELECT id, book_id, status, booked_until FROM book_copies WHERE id = $1")
        .bind(copy_id)
        .fetch_optional(conn)
        .await?;
    row.map(BookCopy::try_from).transpose()
}

pub async fn copies_for_book(book_id: i64, conn: &mut SqliteConnection) -> Result<Vec<BookCopy>, StoreError> {
    let rows = sqlx::query_as::<_, CopyRow>(
        "SELECT id, book_id, status, booked_until FROM book_copies WHERE book_id = $1 ORDER BY id",
    )
    .bind(book_id)
    .fetch_all(conn)
    .await?;
    convert_all(rows)
}

pub async fn count_available(book_id: i64, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM book_copies WHERE book_id = $1 AND status = 'AVAILABLE'",
    )
    .bind(book_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Claims one AVAILABLE copy with a compare-and-swap update. The `status = 'AVAILABLE'` guard on the outer update
/// means a copy that another connection claimed between the sub-select and the update is simply not matched, in which
/// case the claim is retried while copies remain.
pub async fn claim_available_copy(
    book_id: i64,
    status: CopyStatus,
    booked_until: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, StoreError> {
    for attempt in 1..=CLAIM_ATTEMPTS {
        let claimed = sqlx::query_scalar::<_, i64>(
            r#"UPDATE book_copies SET status = $2, booked_until = $3
            WHERE id = (
                SELECT id FROM book_copies WHERE book_id = $1 AND status = 'AVAILABLE' ORDER BY id LIMIT 1
            ) AND status = 'AVAILABLE'
            RETURNING id"#,
        )
        .bind(book_id)
        .bind(status.to_string())
        .bind(booked_until)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(copy_id) = claimed {
            debug!("🗃️ Copy #{copy_id} of book #{book_id} claimed as {status}");
            return Ok(Some(copy_id));
        }
        if count_available(book_id, &mut *conn).await? == 0 {
            return Ok(None);
        }
        debug!("🗃️ Lost a race for a copy of book #{book_id} on attempt {attempt}. Retrying.");
    }
    warn!("🗃️ Could not claim a copy of book #{book_id} after {CLAIM_ATTEMPTS} attempts");
    Ok(None)
}

pub async fn set_copy_status(
    copy_id: i64,
    status: CopyStatus,
    booked_until: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
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
    trace!("🗃️ Copy #{copy_id} is now {status}");
    Ok(())
}

pub async fn release_expired_holds(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<i64>, StoreError> {
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
