//! Note repository implementation.
//!
//! Attachments are an ordered list of URL strings stored as JSONB. They are
//! validated here, at the application boundary; the storage layer never
//! checks what they point at.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fieldbook_core::{
    defaults, validate_attachment_url, CreateNoteRequest, Error, Note, NoteRepository, NoteType,
    Result, UpdateNoteRequest,
};

use crate::constraint::is_foreign_key_violation;

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn validate_attachments(attachments: &[String]) -> Result<()> {
    for url in attachments {
        validate_attachment_url(url).map_err(Error::InvalidInput)?;
    }
    Ok(())
}

fn map_row_to_note(row: sqlx::postgres::PgRow) -> Result<Note> {
    let type_token: String = row.get("note_type");
    let note_type = NoteType::from_str(&type_token).map_err(Error::Serialization)?;

    let attachments: Vec<String> =
        serde_json::from_value(row.get::<JsonValue, _>("attachments"))?;

    Ok(Note {
        id: row.get("id"),
        appointment_id: row.get("appointment_id"),
        user_id: row.get("user_id"),
        note_type,
        content: row.get("content"),
        attachments,
        is_important: row.get("is_important"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Uuid> {
        if req.content.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Note content cannot be empty".to_string(),
            ));
        }
        validate_attachments(&req.attachments)?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notes (id, appointment_id, user_id, note_type, content, attachments, is_important, created_at_utc, updated_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(id)
        .bind(req.appointment_id)
        .bind(req.user_id)
        .bind(req.note_type.to_string())
        .bind(&req.content)
        .bind(serde_json::to_value(&req.attachments)?)
        .bind(req.is_important)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return Error::ForeignKey(format!(
                    "Note references missing appointment {} or user {}",
                    req.appointment_id, req.user_id
                ));
            }
            Error::Database(e)
        })?;

        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(id))?;

        map_row_to_note(row)
    }

    async fn list_for_appointment(&self, appointment_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT * FROM notes WHERE appointment_id = $1 ORDER BY created_at_utc",
        )
        .bind(appointment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_row_to_note).collect()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT * FROM notes WHERE user_id = $1 ORDER BY created_at_utc DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit.unwrap_or(defaults::PAGE_LIMIT))
        .bind(offset.unwrap_or(defaults::PAGE_OFFSET))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_row_to_note).collect()
    }

    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<()> {
        if let Some(content) = &req.content {
            if content.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "Note content cannot be empty".to_string(),
                ));
            }
        }
        let attachments = match &req.attachments {
            Some(list) => {
                validate_attachments(list)?;
                Some(serde_json::to_value(list)?)
            }
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE notes SET
                note_type = COALESCE($2, note_type),
                content = COALESCE($3, content),
                attachments = COALESCE($4, attachments),
                is_important = COALESCE($5, is_important),
                updated_at_utc = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.note_type.map(|t| t.to_string()))
        .bind(&req.content)
        .bind(attachments)
        .bind(req.is_important)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_attachments_all_valid() {
        let attachments = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "http://cdn.example.com/b.pdf".to_string(),
        ];
        assert!(validate_attachments(&attachments).is_ok());
    }

    #[test]
    fn test_validate_attachments_rejects_bad_scheme() {
        let attachments = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "file:///etc/passwd".to_string(),
        ];
        assert!(validate_attachments(&attachments).is_err());
    }

    #[test]
    fn test_validate_attachments_empty_list_ok() {
        assert!(validate_attachments(&[]).is_ok());
    }
}
