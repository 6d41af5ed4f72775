use crate::{
    db_types::{LedgerEntry, NewUser, Rental, User, WalletTopup},
    traits::{HistoryEntry, StoreError},
};

/// Read access to users and everything hanging off them. Nothing here takes locks.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Creates a user with a zero balance. A duplicate email results in [`StoreError::AlreadyExists`].
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn fetch_rental(&self, rental_id: i64) -> Result<Option<Rental>, StoreError>;

    /// The user's rentals, most recent first.
    async fn rental_history(&self, user_id: i64) -> Result<Vec<HistoryEntry>, StoreError>;

    /// The user's ledger entries, most recent first.
    async fn ledger_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn fetch_topup(&self, topup_id: i64) -> Result<Option<WalletTopup>, StoreError>;

    async fn topups_for_user(&self, user_id: i64) -> Result<Vec<WalletTopup>, StoreError>;
}
