//! User Service
//!
//! Admin-side user management. Balance only changes through
//! `increment_balance` here, or through a purchase.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::unique_violation;
use crate::domain::models::USER_COLUMNS;
use crate::domain::{Credit, DomainError, User, UserPatch};
use crate::error::{AppError, AppResult};
use crate::pagination::{paginate, Filter, ListQuery, Page, PageRequest};

/// Columns searched by the user listing
const USER_SEARCH_COLUMNS: &[&str] = &["username", "email", "first_name", "last_name"];

/// Input for a new user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    fn validate(&self) -> Result<(), DomainError> {
        if self.username.trim().is_empty() {
            return Err(DomainError::invalid_input("username is required"));
        }
        if !self.email.contains('@') {
            return Err(DomainError::invalid_input("email is not valid"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewUser) -> AppResult<User> {
        input.validate()?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(input.username.trim())
        .bind(input.email.trim())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_or_database)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        let user: Option<User> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| DomainError::UserNotFound(id).into())
    }

    pub async fn list(&self, request: PageRequest, search: &str) -> AppResult<Page<User>> {
        let query = ListQuery::new(USER_COLUMNS, "users")
            .filter(Filter::live("deleted_at"))
            .order_by("created_at ASC, id ASC")
            .searchable(USER_SEARCH_COLUMNS);

        Ok(paginate(&self.pool, &query, request, search).await?)
    }

    pub async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<User> {
        if patch.is_empty() {
            return Err(DomainError::invalid_input("no fields to update provided").into());
        }
        if matches!(&patch.username, Some(u) if u.trim().is_empty()) {
            return Err(DomainError::invalid_input("username must not be blank").into());
        }
        if matches!(&patch.email, Some(e) if !e.contains('@')) {
            return Err(DomainError::invalid_input("email is not valid").into());
        }

        let mut tx = self.pool.begin().await?;

        let mut user: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DomainError::UserNotFound(id))?;

        if user.is_admin() {
            return Err(DomainError::ProtectedUser("admin".to_string()).into());
        }

        patch.apply(&mut user);

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user.username.trim())
        .bind(user.email.trim())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_or_database)?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "User updated");
        Ok(updated)
    }

    /// Add a positive credit to the balance in one statement.
    pub async fn increment_balance(&self, id: Uuid, credit: Credit) -> AppResult<User> {
        let user: Option<User> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(credit.value())
        .fetch_optional(&self.pool)
        .await?;

        let user = user.ok_or(DomainError::UserNotFound(id))?;

        tracing::info!(
            user_id = %id,
            credit = %credit.value(),
            balance = %user.balance,
            "Balance incremented"
        );
        Ok(user)
    }

    /// Soft delete. The bootstrap admin cannot be removed.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let user = self.get(id).await?;
        if user.is_admin() {
            return Err(DomainError::ProtectedUser("admin".to_string()).into());
        }

        let affected = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DomainError::UserNotFound(id).into());
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

fn duplicate_or_database(err: sqlx::Error) -> AppError {
    match unique_violation(&err) {
        Some(constraint) if constraint.contains("email") => {
            DomainError::Duplicate("email already exists".to_string()).into()
        }
        Some(constraint) if constraint.contains("username") => {
            DomainError::Duplicate("username already exists".to_string()).into()
        }
        Some(_) => DomainError::Duplicate("username or email already exists".to_string()).into(),
        None => AppError::Database(err),
    }
}
