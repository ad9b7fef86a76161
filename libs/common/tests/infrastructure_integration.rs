//! Integration tests for the infrastructure components
//!
//! These tests verify that the SQLite pool is configured the way the
//! services expect: queries work and foreign keys are enforced.

use common::{
    database::{DatabaseConfig, health_check, init_pool},
    error::DatabaseError,
};
use sqlx::Row;

#[tokio::test]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::in_memory()).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "SQLite simple query test failed");

    let row = sqlx::query("PRAGMA foreign_keys").fetch_one(&pool).await?;
    let enabled: i32 = row.get(0);
    assert_eq!(enabled, 1, "foreign keys must be enforced");

    Ok(())
}

#[tokio::test]
async fn test_unique_violation_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::in_memory()).await?;

    sqlx::query("CREATE TABLE people (email TEXT NOT NULL UNIQUE)")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO people (email) VALUES ('a@example.com')")
        .execute(&pool)
        .await?;

    let err = sqlx::query("INSERT INTO people (email) VALUES ('a@example.com')")
        .execute(&pool)
        .await
        .expect_err("duplicate insert must fail");

    assert!(matches!(
        DatabaseError::from_query(err),
        DatabaseError::UniqueViolation(_)
    ));

    Ok(())
}
