//! Program catalogue repository

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;

use super::ProgramStore;
use crate::models::{Program, ProgramCatalog, ProgramVersionRow};

/// Program repository
#[derive(Clone)]
pub struct ProgramRepository {
    pool: SqlitePool,
}

impl ProgramRepository {
    /// Create a new program repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgramStore for ProgramRepository {
    async fn list(&self) -> DatabaseResult<Vec<Program>> {
        let rows = sqlx::query_as::<_, ProgramVersionRow>(
            r#"
            SELECT p.id, p.name, v.version
            FROM programs p
            JOIN program_versions v ON v.program_id = p.id
            ORDER BY p.id, v.position, v.version
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows.into_iter().collect::<ProgramCatalog>().into_programs())
    }

    async fn find(&self, id: i64) -> DatabaseResult<Option<Program>> {
        let rows = sqlx::query_as::<_, ProgramVersionRow>(
            r#"
            SELECT p.id, p.name, v.version
            FROM programs p
            JOIN program_versions v ON v.program_id = p.id
            WHERE p.id = ?
            ORDER BY v.position, v.version
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows
            .into_iter()
            .collect::<ProgramCatalog>()
            .into_programs()
            .into_iter()
            .next())
    }
}
