//! Route repository implementation.
//!
//! The appointment list is an ordered JSONB array, a deliberate
//! relaxed-integrity zone: no engine foreign key, order preserved exactly as
//! inserted. Membership (every ID an existing appointment of the route's
//! user) is checked here at write time instead.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use fieldbook_core::{
    CreateRouteRequest, Error, Result, Route, RouteMetadata, RouteRepository, UpdateRouteRequest,
};

use crate::constraint::is_foreign_key_violation;

/// PostgreSQL implementation of RouteRepository.
pub struct PgRouteRepository {
    pool: Pool<Postgres>,
}

impl PgRouteRepository {
    /// Create a new PgRouteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Verify that every appointment ID exists and belongs to `user_id`.
    async fn validate_membership(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        appointment_ids: &[Uuid],
    ) -> Result<()> {
        if appointment_ids.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query(
            "SELECT id FROM appointments WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(appointment_ids)
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let found: std::collections::HashSet<Uuid> =
            rows.into_iter().map(|row| row.get("id")).collect();

        for id in appointment_ids {
            if !found.contains(id) {
                return Err(Error::ForeignKey(format!(
                    "Route references appointment {} not owned by user {}",
                    id, user_id
                )));
            }
        }
        Ok(())
    }
}

fn map_row_to_route(row: sqlx::postgres::PgRow) -> Result<Route> {
    let appointment_ids: Vec<Uuid> =
        serde_json::from_value(row.get::<JsonValue, _>("appointment_ids"))?;
    let route_metadata = row
        .get::<Option<JsonValue>, _>("route_metadata")
        .map(serde_json::from_value::<RouteMetadata>)
        .transpose()?;

    Ok(Route {
        id: row.get("id"),
        user_id: row.get("user_id"),
        route_date: row.get("route_date"),
        appointment_ids,
        route_metadata,
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn insert(&self, req: CreateRouteRequest) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.validate_membership(&mut tx, req.user_id, &req.appointment_ids)
            .await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let route_metadata = req
            .route_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO routes (id, user_id, route_date, appointment_ids, route_metadata, created_at_utc, updated_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(id)
        .bind(req.user_id)
        .bind(req.route_date)
        .bind(serde_json::to_value(&req.appointment_ids)?)
        .bind(route_metadata)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return Error::ForeignKey(format!("Route references missing user {}", req.user_id));
            }
            Error::Database(e)
        })?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "routes",
            op = "insert",
            route_id = %id,
            user_id = %req.user_id,
            stop_count = req.appointment_ids.len(),
            "Route stored"
        );
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Route> {
        let row = sqlx::query("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::RouteNotFound(id))?;

        map_row_to_route(row)
    }

    async fn find_for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Route>> {
        let rows = sqlx::query(
            "SELECT * FROM routes WHERE user_id = $1 AND route_date = $2 ORDER BY created_at_utc",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_row_to_route).collect()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Route>> {
        let rows = sqlx::query(
            "SELECT * FROM routes WHERE user_id = $1 ORDER BY route_date DESC, created_at_utc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(map_row_to_route).collect()
    }

    async fn update(&self, id: Uuid, req: UpdateRouteRequest) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query("SELECT user_id FROM routes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::RouteNotFound(id))?;
        let user_id: Uuid = row.get("user_id");

        let appointment_ids = match &req.appointment_ids {
            Some(ids) => {
                self.validate_membership(&mut tx, user_id, ids).await?;
                Some(serde_json::to_value(ids)?)
            }
            None => None,
        };
        let route_metadata = req
            .route_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            UPDATE routes SET
                route_date = COALESCE($2, route_date),
                appointment_ids = COALESCE($3, appointment_ids),
                route_metadata = COALESCE($4, route_metadata),
                updated_at_utc = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.route_date)
        .bind(appointment_ids)
        .bind(route_metadata)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::RouteNotFound(id));
        }
        Ok(())
    }
}
