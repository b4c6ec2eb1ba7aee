use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::StorageConfig;
use crate::store::StoreError;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(e) => StoreError::Sqlx(e),
            other => StoreError::ConfigMissing(other.to_string()),
        }
    }
}

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS directory_groups (
        name TEXT PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS directory_members (
        email TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        law_firm TEXT NOT NULL,
        phone TEXT NOT NULL DEFAULT '',
        country TEXT NOT NULL,
        groups TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS directory_members_groups_idx ON directory_members USING GIN (groups)"#,
];

/// Opens the connection pool once at startup; the pool is then handed to the
/// store that owns it.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &StorageConfig) -> Result<PgPool, DatabaseError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .connect(database_url)
            .await?;

        info!(
            "Created database pool for {}{}",
            url.host_str().unwrap_or("localhost"),
            url.path()
        );
        Ok(pool)
    }

    /// Create the directory tables when they do not exist yet.
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
