//! Schema migrations and store bootstrap for the authentication service

use common::{
    database::{DatabaseConfig, health_check, init_pool},
    error::{DatabaseError, DatabaseResult},
};
use sqlx::{SqlitePool, migrate::Migrator};
use tracing::info;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations.
pub async fn migrate(pool: &SqlitePool) -> DatabaseResult<()> {
    info!("Running database migrations");
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    info!("Migrations applied successfully");
    Ok(())
}

/// Open the pool, migrate and verify connectivity.
pub async fn prepare(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = init_pool(config).await?;
    migrate(&pool).await?;
    if !health_check(&pool).await? {
        return Err(DatabaseError::Configuration(
            "database health check failed".to_string(),
        ));
    }
    Ok(pool)
}

/// A migrated private in-memory store.
pub async fn in_memory() -> DatabaseResult<SqlitePool> {
    prepare(&DatabaseConfig::in_memory()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = in_memory().await.expect("in-memory store");

        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("list tables");
        let tables: Vec<String> = rows.iter().map(|row| row.get("name")).collect();

        assert_eq!(tables, vec!["program_versions", "programs", "sessions", "users"]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = in_memory().await.expect("in-memory store");
        migrate(&pool).await.expect("second run is a no-op");
    }
}
