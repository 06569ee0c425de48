//! Organisation repository implementation.
//!
//! Organisations are a shared catalog imported from the external places
//! provider; there is no owning user and no cascade from users. The partial
//! unique index on place_id keeps a real-world place from being imported
//! twice.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use fieldbook_core::{
    defaults, validate_coordinates, CreateOrganisationRequest, Error, ListOrganisationsRequest,
    OpeningHours, Organisation, OrganisationRepository, OrganisationType, Result,
    UpdateOrganisationRequest,
};

use crate::constraint::{constraint_name, is_check_violation, is_unique_violation};

/// PostgreSQL implementation of OrganisationRepository.
pub struct PgOrganisationRepository {
    pool: Pool<Postgres>,
}

impl PgOrganisationRepository {
    /// Create a new PgOrganisationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_organisation(row: sqlx::postgres::PgRow) -> Result<Organisation> {
    let type_token: String = row.get("organisation_type");
    let organisation_type =
        OrganisationType::from_str(&type_token).map_err(Error::Serialization)?;

    let opening_hours = row
        .get::<Option<JsonValue>, _>("opening_hours")
        .map(serde_json::from_value::<OpeningHours>)
        .transpose()?;

    Ok(Organisation {
        id: row.get("id"),
        place_id: row.get("place_id"),
        name: row.get("name"),
        phone: row.get("phone"),
        email: row.get("email"),
        website: row.get("website"),
        address: row.get("address"),
        city: row.get("city"),
        state: row.get("state"),
        postal_code: row.get("postal_code"),
        country: row.get("country"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        organisation_type,
        description: row.get("description"),
        business_status: row.get("business_status"),
        rating: row.get("rating"),
        user_ratings_total: row.get("user_ratings_total"),
        photo_reference: row.get("photo_reference"),
        opening_hours,
        is_active: row.get("is_active"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl OrganisationRepository for PgOrganisationRepository {
    async fn insert(&self, req: CreateOrganisationRequest) -> Result<Uuid> {
        validate_coordinates(req.latitude, req.longitude).map_err(Error::InvalidInput)?;
        if req.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Organisation name cannot be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let opening_hours = req
            .opening_hours
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO organisations (
                id, place_id, name, phone, email, website,
                address, city, state, postal_code, country,
                latitude, longitude, organisation_type, description,
                business_status, rating, user_ratings_total, photo_reference,
                opening_hours, created_at_utc, updated_at_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $21)
            "#,
        )
        .bind(id)
        .bind(&req.place_id)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(&req.address)
        .bind(&req.city)
        .bind(&req.state)
        .bind(&req.postal_code)
        .bind(&req.country)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(req.organisation_type.to_string())
        .bind(&req.description)
        .bind(&req.business_status)
        .bind(req.rating)
        .bind(req.user_ratings_total)
        .bind(&req.photo_reference)
        .bind(opening_hours)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                let place = req.place_id.as_deref().unwrap_or("?");
                return Error::Duplicate(format!("Place '{}' is already imported", place));
            }
            if is_check_violation(&e) {
                return Error::InvalidInput(format!(
                    "Organisation violates constraint {}",
                    constraint_name(&e).unwrap_or_default()
                ));
            }
            Error::Database(e)
        })?;

        debug!(
            subsystem = "database",
            component = "organisations",
            op = "insert",
            organisation_id = %id,
            "Organisation imported"
        );
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Organisation> {
        let row = sqlx::query("SELECT * FROM organisations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::OrganisationNotFound(id))?;

        map_row_to_organisation(row)
    }

    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<Organisation>> {
        let row = sqlx::query("SELECT * FROM organisations WHERE place_id = $1")
            .bind(place_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(map_row_to_organisation).transpose()
    }

    async fn list(&self, req: ListOrganisationsRequest) -> Result<Vec<Organisation>> {
        let mut query = String::from("SELECT * FROM organisations WHERE 1=1 ");
        let mut param_idx = 1;

        if req.name_contains.is_some() {
            query.push_str(&format!(
                "AND name ILIKE '%' || ${} || '%' ESCAPE '\\' ",
                param_idx
            ));
            param_idx += 1;
        }
        if req.organisation_type.is_some() {
            query.push_str(&format!("AND organisation_type = ${} ", param_idx));
            param_idx += 1;
        }
        if req.is_active.is_some() {
            query.push_str(&format!("AND is_active = ${} ", param_idx));
            param_idx += 1;
        }
        if req.bounds.is_some() {
            query.push_str(&format!(
                "AND latitude BETWEEN ${} AND ${} AND longitude BETWEEN ${} AND ${} ",
                param_idx,
                param_idx + 2,
                param_idx + 1,
                param_idx + 3
            ));
            param_idx += 4;
        }
        query.push_str(&format!(
            "ORDER BY name LIMIT ${} OFFSET ${}",
            param_idx,
            param_idx + 1
        ));

        let mut q = sqlx::query(&query);
        if let Some(name) = &req.name_contains {
            q = q.bind(crate::escape_like(name));
        }
        if let Some(t) = req.organisation_type {
            q = q.bind(t.to_string());
        }
        if let Some(active) = req.is_active {
            q = q.bind(active);
        }
        if let Some((min_lat, min_lng, max_lat, max_lng)) = req.bounds {
            q = q.bind(min_lat).bind(min_lng).bind(max_lat).bind(max_lng);
        }
        q = q
            .bind(req.limit.unwrap_or(defaults::PAGE_LIMIT))
            .bind(req.offset.unwrap_or(defaults::PAGE_OFFSET));

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        rows.into_iter().map(map_row_to_organisation).collect()
    }

    async fn update(&self, id: Uuid, req: UpdateOrganisationRequest) -> Result<()> {
        let opening_hours = req
            .opening_hours
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE organisations SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                website = COALESCE($5, website),
                address = COALESCE($6, address),
                description = COALESCE($7, description),
                organisation_type = COALESCE($8, organisation_type),
                business_status = COALESCE($9, business_status),
                rating = COALESCE($10, rating),
                user_ratings_total = COALESCE($11, user_ratings_total),
                opening_hours = COALESCE($12, opening_hours),
                updated_at_utc = $13
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(&req.address)
        .bind(&req.description)
        .bind(req.organisation_type.map(|t| t.to_string()))
        .bind(&req.business_status)
        .bind(req.rating)
        .bind(req.user_ratings_total)
        .bind(opening_hours)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::OrganisationNotFound(id));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE organisations SET is_active = $2, updated_at_utc = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::OrganisationNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM organisations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::OrganisationNotFound(id));
        }
        Ok(())
    }
}
