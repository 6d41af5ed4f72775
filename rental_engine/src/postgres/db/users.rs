use chrono::Utc;
use log::*;
use sqlx::PgConnection;

use crate::{
    db_types::{Money, NewUser, User},
    traits::StoreError,
};

pub async fn insert_user(user: NewUser, conn: &mut PgConnection) -> Result<User, StoreError> {
    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (email, display_name, balance, created_at) VALUES ($1, $2, 0, $3)
        RETURNING id, email, display_name, balance, created_at"#,
    )
    .bind(user.email)
    .bind(user.display_name)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User #{} ({}) created", user.id, user.email);
    Ok(user)
}

pub async fn fetch_user(user_id: i64, conn: &mut PgConnection) -> Result<Option<User>, StoreError> {
    let user =
        sqlx::query_as::<_, User>("SELECT id, email, display_name, balance, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(user)
}

pub async fn fetch_user_by_email(email: &str, conn: &mut PgConnection) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, display_name, balance, created_at FROM users WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn lock_balance(user_id: i64, conn: &mut PgConnection) -> Result<Option<Money>, StoreError> {
    let balance = sqlx::query_scalar::<_, Money>("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    trace!("🗃️ Balance for user #{user_id} locked");
    Ok(balance)
}

pub async fn set_balance(user_id: i64, balance: Money, conn: &mut PgConnection) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
        .bind(user_id)
        .bind(balance)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::MissingRecord(format!("user #{user_id}")));
    }
    Ok(())
}
