use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use super::models::{Student, StudentIn};
use super::StudentStore;
use crate::error::DatabaseError;

pub struct DbOperations {
    pool: PgPool,
}

impl DbOperations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl StudentStore for DbOperations {
    async fn create_student(&self, student: &StudentIn) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO students (firstname, lastname, mothername, fathername, age, gender) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&student.firstname)
        .bind(&student.lastname)
        .bind(&student.mothername)
        .bind(&student.fathername)
        .bind(student.age)
        .bind(&student.gender)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<Student>, DatabaseError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT id, firstname, lastname, mothername, fathername, age, gender \
             FROM students ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn apply_migrations(&self, path: &Path) -> Result<bool, DatabaseError> {
        if !path.exists() {
            return Ok(false);
        }

        let sql = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("{}: {}", path.display(), e)))?;

        // Unprepared execution so the script may hold several statements
        self.pool
            .execute(sql.as_str())
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

        info!("Applied {}", path.display());
        Ok(true)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
