//! # fieldbook-db
//!
//! PostgreSQL database layer for fieldbook.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - Cascade-on-delete referential policy from users to every owned row
//! - Transactional audit logging for appointment state changes
//!
//! ## Example
//!
//! ```rust,ignore
//! use fieldbook_db::Database;
//! use fieldbook_core::{CreateUserRequest, UserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/fieldbook").await?;
//!
//!     let user_id = db.users.insert(CreateUserRequest {
//!         email: "agent@example.com".to_string(),
//!         password_hash: "argon2id$...".to_string(),
//!         name: Some("Field Agent".to_string()),
//!         phone: None,
//!         avatar_url: None,
//!     }).await?;
//!
//!     println!("Created user: {}", user_id);
//!     Ok(())
//! }
//! ```

pub mod activity_logs;
pub mod appointments;
mod constraint;
pub mod notes;
pub mod organisations;
pub mod pool;
pub mod routes;
pub mod tags;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use fieldbook_core::*;

pub use activity_logs::PgActivityLogRepository;
pub use appointments::PgAppointmentRepository;
pub use notes::PgNoteRepository;
pub use organisations::PgOrganisationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, ping, PoolConfig};
pub use routes::PgRouteRepository;
pub use tags::PgTagRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User account repository.
    pub users: PgUserRepository,
    /// Organisation catalog repository.
    pub organisations: PgOrganisationRepository,
    /// Appointment repository.
    pub appointments: PgAppointmentRepository,
    /// Appointment note repository.
    pub notes: PgNoteRepository,
    /// Per-day route repository.
    pub routes: PgRouteRepository,
    /// Tag and appointment-tag repository.
    pub tags: PgTagRepository,
    /// Append-only audit trail repository.
    pub activity_logs: PgActivityLogRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            organisations: PgOrganisationRepository::new(pool.clone()),
            appointments: PgAppointmentRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            routes: PgRouteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            activity_logs: PgActivityLogRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
