//! Persistence collaborator for user records.
//!
//! The authentication core only reads stored users; registration is the
//! single writer. Loan and notification tables live elsewhere.

use serde::Serialize;
use sqlx::{postgres::PgRow, PgPool, Row};
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "user";

const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

#[derive(ToSchema, Serialize, Debug, Clone)]
pub struct StoredUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2 PHC hash, never serialized into responses.
    #[serde(skip)]
    pub password: String,
    pub role: String,
}

impl StoredUser {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password: row.get("password"),
            role: row.get("role"),
        }
    }
}

/// Create the users table if it does not exist yet.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` on failure.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_USERS_TABLE).execute(pool).await?;

    Ok(())
}

/// # Errors
///
/// Returns the underlying `sqlx::Error` on failure.
pub async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<StoredUser>, sqlx::Error> {
    sqlx::query("SELECT id, email, name, password, role FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map(|row| row.as_ref().map(StoredUser::from_row))
}

/// # Errors
///
/// Returns the underlying `sqlx::Error` on failure.
pub async fn lookup_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<StoredUser>, sqlx::Error> {
    sqlx::query("SELECT id, email, name, password, role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map(|row| row.as_ref().map(StoredUser::from_row))
}

/// True when the error is a unique-constraint violation, raised by a
/// duplicate email racing the pre-insert existence check.
#[must_use]
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Insert a new user record and return it.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` on failure, including unique
/// violations when the pre-insert existence check raced.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    role: &str,
) -> Result<StoredUser, sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (email, name, password, role) VALUES ($1, $2, $3, $4)
         RETURNING id, email, name, password, role",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .map(|row| StoredUser::from_row(&row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }
}
