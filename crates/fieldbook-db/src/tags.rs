//! Tag repository implementation.
//!
//! Tag names are unique per user, not globally: the constraint key carries
//! the owner. The appointment/tag join is keyed on the pair, so attaching an
//! already attached tag is a no-op rather than a duplicate row.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fieldbook_core::{
    defaults, validate_hex_color, validate_tag_name, CreateTagRequest, Error, Result, Tag,
    TagRepository, TagWithCount, UpdateTagRequest,
};

use crate::constraint::{is_foreign_key_violation, is_unique_violation};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_tag(row: &sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, req: CreateTagRequest) -> Result<Uuid> {
        validate_tag_name(&req.name).map_err(Error::InvalidInput)?;
        let color = req.color.unwrap_or_else(|| defaults::TAG_COLOR.to_string());
        validate_hex_color(&color).map_err(Error::InvalidInput)?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO tags (id, user_id, name, color, created_at_utc) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(req.user_id)
        .bind(&req.name)
        .bind(&color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::Duplicate(format!(
                    "Tag '{}' already exists for user {}",
                    req.name, req.user_id
                ));
            }
            if is_foreign_key_violation(&e) {
                return Error::ForeignKey(format!("Tag references missing user {}", req.user_id));
            }
            Error::Database(e)
        })?;

        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Tag> {
        let row = sqlx::query("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::TagNotFound(id))?;

        Ok(map_row_to_tag(&row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TagWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id, t.user_id, t.name, t.color, t.created_at_utc,
                COUNT(at.appointment_id) AS appointment_count
            FROM tags t
            LEFT JOIN appointment_tags at ON t.id = at.tag_id
            WHERE t.user_id = $1
            GROUP BY t.id, t.user_id, t.name, t.color, t.created_at_utc
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| TagWithCount {
                tag: map_row_to_tag(&row),
                appointment_count: row.get("appointment_count"),
            })
            .collect();

        Ok(tags)
    }

    async fn update(&self, id: Uuid, req: UpdateTagRequest) -> Result<()> {
        if let Some(name) = &req.name {
            validate_tag_name(name).map_err(Error::InvalidInput)?;
        }
        if let Some(color) = &req.color {
            validate_hex_color(color).map_err(Error::InvalidInput)?;
        }

        let result = sqlx::query(
            "UPDATE tags SET name = COALESCE($2, name), color = COALESCE($3, color) WHERE id = $1",
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.color)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::Duplicate(format!(
                    "Another tag already uses the name '{}'",
                    req.name.as_deref().unwrap_or("?")
                ));
            }
            Error::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::TagNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::TagNotFound(id));
        }
        Ok(())
    }

    async fn add_to_appointment(&self, appointment_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO appointment_tags (appointment_id, tag_id, created_at_utc)
             VALUES ($1, $2, $3)
             ON CONFLICT (appointment_id, tag_id) DO NOTHING",
        )
        .bind(appointment_id)
        .bind(tag_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return Error::ForeignKey(format!(
                    "Link references missing appointment {} or tag {}",
                    appointment_id, tag_id
                ));
            }
            Error::Database(e)
        })?;

        Ok(())
    }

    async fn remove_from_appointment(&self, appointment_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM appointment_tags WHERE appointment_id = $1 AND tag_id = $2")
            .bind(appointment_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn get_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.user_id, t.name, t.color, t.created_at_utc
            FROM tags t
            JOIN appointment_tags at ON t.id = at.tag_id
            WHERE at.appointment_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_row_to_tag).collect())
    }

    async fn set_for_appointment(&self, appointment_id: Uuid, tag_ids: Vec<Uuid>) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Remove existing links
        sqlx::query("DELETE FROM appointment_tags WHERE appointment_id = $1")
            .bind(appointment_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // Add new links
        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO appointment_tags (appointment_id, tag_id, created_at_utc)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (appointment_id, tag_id) DO NOTHING",
            )
            .bind(appointment_id)
            .bind(tag_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return Error::ForeignKey(format!(
                        "Link references missing appointment {} or tag {}",
                        appointment_id, tag_id
                    ));
                }
                Error::Database(e)
            })?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
