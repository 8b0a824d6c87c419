//! Database repository for the school directory and key-value store.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::School;

const DUPLICATE_SCHOOL: &str = "A school with this name already exists in this county.";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== SCHOOL OPERATIONS ====================

    /// List schools in one county, ordered by name.
    pub async fn list_schools_by_county(&self, county: &str) -> Result<Vec<School>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, county, created_at FROM schools WHERE county = ? COLLATE NOCASE ORDER BY name",
        )
        .bind(county.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(school_from_row).collect())
    }

    /// List every school, ordered by name ascending.
    pub async fn list_schools(&self) -> Result<Vec<School>, AppError> {
        let rows = sqlx::query("SELECT id, name, county, created_at FROM schools ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(school_from_row).collect())
    }

    /// Find a school by its `(name, county)` pair, ignoring case.
    pub async fn find_school(&self, name: &str, county: &str) -> Result<Option<School>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, county, created_at FROM schools WHERE name = ? COLLATE NOCASE AND county = ? COLLATE NOCASE",
        )
        .bind(name)
        .bind(county)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(school_from_row))
    }

    /// Register a school.
    ///
    /// The existence check and the insert are separate statements, so two
    /// concurrent adders can both pass the check. The unique index catches the
    /// loser and its constraint violation is reported as a duplicate too.
    pub async fn add_school(&self, name: &str, county: &str) -> Result<School, AppError> {
        let name = name.trim();
        let county = county.trim();
        if name.is_empty() || county.is_empty() {
            return Err(AppError::Validation(
                "School name and county are required".to_string(),
            ));
        }

        if self.find_school(name, county).await?.is_some() {
            return Err(AppError::Duplicate(DUPLICATE_SCHOOL.to_string()));
        }

        let school = School {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            county: county.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let result = sqlx::query("INSERT INTO schools (id, name, county, created_at) VALUES (?, ?, ?, ?)")
            .bind(&school.id)
            .bind(&school.name)
            .bind(&school.county)
            .bind(&school.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(school),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::warn!("Concurrent insert of school '{}' in {} rejected", name, county);
                Err(AppError::Duplicate(DUPLICATE_SCHOOL.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ==================== KEY-VALUE OPERATIONS ====================

    /// Read a raw value.
    pub async fn kv_get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Insert or replace a raw value.
    pub async fn kv_set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a value. Removing a missing key is not an error.
    pub async fn kv_remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn school_from_row(row: &SqliteRow) -> School {
    School {
        id: row.get("id"),
        name: row.get("name"),
        county: row.get("county"),
        created_at: row.get("created_at"),
    }
}
