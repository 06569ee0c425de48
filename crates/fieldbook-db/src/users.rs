//! User repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use fieldbook_core::{
    validate_email, CreateUserRequest, Error, Result, UpdateUserRequest, User, UserRepository,
};

use crate::constraint::is_unique_violation;

/// PostgreSQL implementation of UserRepository.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_user(row: sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        phone: row.get("phone"),
        avatar_url: row.get("avatar_url"),
        is_active: row.get("is_active"),
        email_verified: row.get("email_verified"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, req: CreateUserRequest) -> Result<Uuid> {
        validate_email(&req.email).map_err(Error::InvalidInput)?;
        if req.password_hash.is_empty() {
            return Err(Error::InvalidInput(
                "Password hash cannot be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, avatar_url, created_at_utc, updated_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(id)
        .bind(&req.email)
        .bind(&req.password_hash)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.avatar_url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::Duplicate(format!("Email '{}' is already registered", req.email));
            }
            Error::Database(e)
        })?;

        debug!(
            subsystem = "database",
            component = "users",
            op = "insert",
            user_id = %id,
            "User created"
        );
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::UserNotFound(id))?;

        Ok(map_row_to_user(row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(map_row_to_user))
    }

    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                avatar_url = COALESCE($4, avatar_url),
                email_verified = COALESCE($5, email_verified),
                updated_at_utc = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.avatar_url)
        .bind(req.email_verified)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET is_active = $2, updated_at_utc = $3 WHERE id = $1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.get("present"))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // ON DELETE CASCADE removes appointments, notes, routes, tags,
        // activity logs, and join rows in the same statement.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }

        debug!(
            subsystem = "database",
            component = "users",
            op = "delete",
            user_id = %id,
            "User and owned rows deleted"
        );
        Ok(())
    }
}
