use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Book, Money, NewBook},
    traits::StoreError,
};

const BOOK_WITH_STOCK: &str = r#"
    SELECT b.id, b.name, b.category, b.rental_cost,
        (SELECT COUNT(*) FROM book_copies c WHERE c.book_id = b.id AND c.status = 'AVAILABLE') AS available_copies
    FROM books b"#;

pub async fn insert_book(book: NewBook, conn: &mut SqliteConnection) -> Result<Book, StoreError> {
    let book = sqlx::query_as::<_, Book>(
        r#"INSERT INTO books (name, category, rental_cost, created_at) VALUES ($1, $2, $3, $4)
        RETURNING id, name, category, rental_cost, 0 AS available_copies"#,
    )
    .bind(book.name)
    .bind(book.category)
    .bind(book.rental_cost)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Book #{} [{}] added to the catalog", book.id, book.name);
    Ok(book)
}

pub async fn fetch_book(book_id: i64, conn: &mut SqliteConnection) -> Result<Option<Book>, StoreError> {
    let q = format!("{BOOK_WITH_STOCK} WHERE b.id = $1");
    let book = sqlx::query_as::<_, Book>(&q).bind(book_id).fetch_optional(conn).await?;
    Ok(book)
}

pub async fn list_books(conn: &mut SqliteConnection) -> Result<Vec<Book>, StoreError> {
    let q = format!("{BOOK_WITH_STOCK} ORDER BY b.id DESC");
    let books = sqlx::query_as::<_, Book>(&q).fetch_all(conn).await?;
    Ok(books)
}

pub async fn book_price(book_id: i64, conn: &mut SqliteConnection) -> Result<Option<Money>, StoreError> {
    let price = sqlx::query_scalar::<_, Money>("SELECT rental_cost FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_optional(conn)
        .await?;
    Ok(price)
}
