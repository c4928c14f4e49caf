//! PostgreSQL user repository

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{EMAIL_TAKEN, UserRepository};
use crate::error::{DatabaseError, RepositoryError, RepositoryResult};
use crate::models::{NewUser, UpdateUser, User};

/// User repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email_address: row.get("email_address"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a failed write, turning unique violations into conflicts
fn write_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(EMAIL_TAKEN.to_string())
        }
        _ => DatabaseError::Query(e).into(),
    }
}

fn read_error(e: sqlx::Error) -> RepositoryError {
    DatabaseError::Query(e).into()
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> RepositoryResult<User> {
        info!("Creating new user: {}", new_user.email_address);

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, email_address, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email_address, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email_address)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(user_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email_address, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email_address: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email_address, password_hash, created_at, updated_at
            FROM users
            WHERE email_address = $1
            "#,
        )
        .bind(email_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> RepositoryResult<Option<User>> {
        info!("Updating user: {}", id);

        let row = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email_address = COALESCE($3, email_address),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email_address, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email_address)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        info!("Deleting user: {}", id);

        // notes and attachments go with the user through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(read_error)?;

        Ok(result.rows_affected() > 0)
    }
}
