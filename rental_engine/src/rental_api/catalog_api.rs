use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Book, BookCopy, NewBook},
    rental_api::{errors::CatalogApiError, rental_objects::BookDetail},
    traits::CatalogManagement,
};

/// `CatalogApi` browses and maintains the catalog of books and their physical copies.
pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_book(&self, book: NewBook) -> Result<Book, CatalogApiError> {
        if book.name.trim().is_empty() {
            return Err(CatalogApiError::InvalidInput("A book needs a name".into()));
        }
        if book.rental_cost.is_negative() {
            return Err(CatalogApiError::InvalidInput(format!("Rental cost cannot be negative ({})", book.rental_cost)));
        }
        let book = self.db.create_book(book).await?;
        info!("🔄️📚️ Book #{} [{}] added to the catalog at {}", book.id, book.name, book.rental_cost);
        Ok(book)
    }

    /// Puts `count` new copies of the book on the shelf.
    pub async fn add_copies(&self, book_id: i64, count: u32) -> Result<Vec<BookCopy>, CatalogApiError> {
        if count == 0 {
            return Err(CatalogApiError::InvalidInput("At least one copy must be added".into()));
        }
        if self.db.fetch_book(book_id).await?.is_none() {
            return Err(CatalogApiError::BookNotFound(book_id));
        }
        let copies = self.db.add_copies(book_id, count).await?;
        info!("🔄️📚️ {count} copies of book #{book_id} added");
        Ok(copies)
    }

    /// All books, newest first.
    pub async fn list_books(&self) -> Result<Vec<Book>, CatalogApiError> {
        let books = self.db.list_books().await?;
        Ok(books)
    }

    pub async fn book_detail(&self, book_id: i64) -> Result<BookDetail, CatalogApiError> {
        let book = self.db.fetch_book(book_id).await?.ok_or(CatalogApiError::BookNotFound(book_id))?;
        let copies = self.db.copies_for_book(book_id).await?;
        Ok(BookDetail { book, copies })
    }

    pub async fn copy(&self, copy_id: i64) -> Result<Option<BookCopy>, CatalogApiError> {
        let copy = self.db.fetch_copy(copy_id).await?;
        Ok(copy)
    }
}
