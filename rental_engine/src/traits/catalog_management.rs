use crate::{
    db_types::{Book, BookCopy, NewBook},
    traits::StoreError,
};

/// Catalog queries and maintenance. None of these take part in a booking transaction.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn create_book(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Adds `count` new AVAILABLE copies to an existing book.
    async fn add_copies(&self, book_id: i64, count: u32) -> Result<Vec<BookCopy>, StoreError>;

    /// Fetches the book with its derived stock.
    async fn fetch_book(&self, book_id: i64) -> Result<Option<Book>, StoreError>;

    /// All books, newest first, with their derived stock.
    async fn list_books(&self) -> Result<Vec<Book>, StoreError>;

    async fn fetch_copy(&self, copy_id: i64) -> Result<Option<BookCopy>, StoreError>;

    async fn copies_for_book(&self, book_id: i64) -> Result<Vec<BookCopy>, StoreError>;
}
