use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::preferences::Preferences;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::RwLock;
use tracing::debug;

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Persisted user preferences, read and written whole.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self) -> Result<Preferences>;
    async fn save(&self, preferences: &Preferences) -> Result<()>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // every connection to an in-memory database sees its own empty schema
        let pool_options = if database_url.starts_with(MEMORY_DATABASE_URL) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;

        let storage = Self { pool };
        storage.ensure_preferences_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_preferences_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                id         INTEGER PRIMARY KEY CHECK (id = 1),
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure preferences table exists")?;
        Ok(())
    }

    /// Missing rows read as default preferences.
    pub async fn load_preferences(&self) -> Result<Preferences> {
        let row = sqlx::query("SELECT body FROM preferences WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("failed to read preferences")?;
        let Some(row) = row else {
            debug!("no stored preferences, using defaults");
            return Ok(Preferences::default());
        };
        let body: String = row.try_get("body")?;
        serde_json::from_str(&body).context("stored preferences are not valid json")
    }

    pub async fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let body = serde_json::to_string(preferences).context("failed to encode preferences")?;
        sqlx::query(
            "INSERT INTO preferences (id, body, updated_at) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET body=excluded.body, updated_at=excluded.updated_at",
        )
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("failed to write preferences")?;
        Ok(())
    }

    pub async fn preferences_updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT updated_at FROM preferences WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("failed to read preferences timestamp")?;
        row.map(|row| row.try_get::<DateTime<Utc>, _>("updated_at"))
            .transpose()
            .map_err(Into::into)
    }
}

#[async_trait]
impl PreferencesStore for Storage {
    async fn get(&self) -> Result<Preferences> {
        self.load_preferences().await
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        self.save_preferences(preferences).await
    }
}

/// Preferences kept in process memory only.
#[derive(Default)]
pub struct MemoryPreferences {
    inner: RwLock<Preferences>,
}

impl MemoryPreferences {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            inner: RwLock::new(preferences),
        }
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferences {
    async fn get(&self) -> Result<Preferences> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        *self.inner.write().await = preferences.clone();
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_DATABASE_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
