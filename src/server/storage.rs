//! SQLite-backed plant storage for the server.

use chrono::{DateTime, Utc};
use planta_core::RemotePlant;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Plant records in insertion order.
#[derive(Debug, Clone)]
pub struct PlantStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PlantRow {
    id: String,
    name: String,
    interval_days: i64,
    last_watered: String,
}

impl From<PlantRow> for RemotePlant {
    fn from(row: PlantRow) -> Self {
        RemotePlant {
            id: Some(row.id),
            name: row.name,
            interval: row.interval_days,
            last_watered: Some(
                DateTime::parse_from_rfc3339(&row.last_watered)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            ),
        }
    }
}

impl PlantStore {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        // A single connection keeps every query on the same memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn list(&self) -> Result<Vec<RemotePlant>, sqlx::Error> {
        let rows: Vec<PlantRow> = sqlx::query_as(
            "SELECT id, name, interval_days, last_watered FROM plants ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RemotePlant::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<RemotePlant>, sqlx::Error> {
        let row: Option<PlantRow> = sqlx::query_as(
            "SELECT id, name, interval_days, last_watered FROM plants WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RemotePlant::from))
    }

    /// Inserts a plant watered now and returns the stored record.
    pub async fn create(
        &self,
        name: &str,
        interval_days: NonZeroU32,
    ) -> Result<RemotePlant, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO plants (id, name, interval_days, last_watered, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(i64::from(interval_days.get()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(&id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Sets `last_watered` to now. Returns `None` for an unknown id.
    pub async fn mark_watered(&self, id: &str) -> Result<Option<RemotePlant>, sqlx::Error> {
        let result = sqlx::query("UPDATE plants SET last_watered = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Returns false if no plant had this id.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plants WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
