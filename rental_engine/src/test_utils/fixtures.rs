use crate::{
    db_types::{Book, Money, NewBook, NewUser, User},
    traits::{AccountManagement, CatalogManagement, RentalStore},
    WalletApi,
};

use super::MockGateway;

/// Registers a user and funds their wallet with an ADJUSTMENT entry, so that the ledger replays to the balance.
pub async fn seed_user<B>(db: &B, email: &str, balance: i64) -> User
where B: RentalStore + AccountManagement {
    let user = db.create_user(NewUser::new(email, "Test reader")).await.expect("Error creating user");
    if balance > 0 {
        let wallet = WalletApi::new(db.clone(), MockGateway::new());
        wallet.adjust_balance(user.id, Money::from(balance), "opening balance").await.expect("Error funding user");
    }
    db.fetch_user(user.id).await.expect("Error fetching user").expect("User vanished")
}

/// Adds a book with `copies` copies on the shelf.
pub async fn seed_book<B>(db: &B, name: &str, price: i64, copies: u32) -> Book
where B: CatalogManagement {
    let book = db.create_book(NewBook::new(name, "Fiction", Money::from(price))).await.expect("Error creating book");
    if copies > 0 {
        db.add_copies(book.id, copies).await.expect("Error adding copies");
    }
    db.fetch_book(book.id).await.expect("Error fetching book").expect("Book vanished")
}
