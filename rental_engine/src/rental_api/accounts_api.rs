//! Unifies API for accessing users and their rentals.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewUser, Rental, User},
    rental_api::errors::AccountApiError,
    traits::{AccountManagement, StoreError},
};

/// The `AccountApi` provides a unified API for accessing users.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new user with an empty wallet. Emails are unique.
    pub async fn create_user(&self, user: NewUser) -> Result<User, AccountApiError> {
        let email = user.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AccountApiError::InvalidInput(format!("'{email}' is not an email address")));
        }
        if user.display_name.trim().is_empty() {
            return Err(AccountApiError::InvalidInput("A display name is required".into()));
        }
        let user = NewUser::new(email.to_string(), user.display_name.trim().to_string());
        let email = user.email.clone();
        match self.db.create_user(user).await {
            Ok(user) => {
                info!("🔄️👤️ User #{} registered", user.id);
                Ok(user)
            },
            Err(StoreError::AlreadyExists(_)) => Err(AccountApiError::EmailTaken(email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches the user with the given id. If no user exists, `None` is returned.
    pub async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, AccountApiError> {
        let user = self.db.fetch_user(user_id).await?;
        Ok(user)
    }

    pub async fn user(&self, user_id: i64) -> Result<User, AccountApiError> {
        self.fetch_user(user_id).await?.ok_or(AccountApiError::UserNotFound(user_id))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError> {
        let user = self.db.fetch_user_by_email(email).await?;
        Ok(user)
    }

    pub async fn rental(&self, rental_id: i64) -> Result<Option<Rental>, AccountApiError> {
        let rental = self.db.fetch_rental(rental_id).await?;
        Ok(rental)
    }
}
