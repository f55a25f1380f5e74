use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::domain::page_request::PageRequest;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_entry::SubscriberEntry;
use crate::store::{StoreError, SubscriberStore};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Subscriber store backed by a SQLite connection pool. Cloning shares the pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database eagerly, so a bad path fails here and not on the
    /// first request.
    #[tracing::instrument(
        name = "Opening the subscriber store",
        skip(config),
        fields(path = %config.path)
    )]
    pub async fn connect(config: &DatabaseSettings) -> Result<Self, StoreError> {
        let db_pool = SqlitePoolOptions::new()
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(config.get_db_options())
            .await
            .map_err(StoreError::ConnectError)?;

        Ok(Self { db_pool })
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.db_pool.close().await;
    }
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    #[tracing::instrument(name = "Ensuring the subscriber schema exists", skip(self))]
    async fn create_if_absent(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emails (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                email        TEXT NOT NULL UNIQUE,
                confirmed_at INTEGER,
                opt_out      INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "Insert a new subscriber into the database",
        skip(self, email),
        fields(email = %email)
    )]
    async fn create(&self, email: &SubscriberEmail) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO emails (email, confirmed_at, opt_out)
            VALUES (?, NULL, 0)
            "#,
        )
        .bind(email.as_ref())
        .execute(&self.db_pool)
        .await
        .map_err(|err| {
            tracing::error!("Failed to execute query: {:?}", err);
            err
        })?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch a subscriber by email", skip(self))]
    async fn get_one(&self, email: &str) -> Result<Option<SubscriberEntry>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, confirmed_at, opt_out
            FROM emails
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    #[tracing::instrument(
        name = "Update a subscriber",
        skip(self, entry),
        fields(email = %entry.email)
    )]
    async fn update(&self, entry: &SubscriberEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE emails
            SET confirmed_at = ?, opt_out = ?
            WHERE email = ?
            "#,
        )
        .bind(entry.confirmed_at.map(|confirmed_at| confirmed_at.timestamp()))
        .bind(entry.opt_out)
        .bind(&entry.email)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("No subscriber found for {}, nothing updated", entry.email);
        }

        Ok(())
    }

    #[tracing::instrument(name = "Delete a subscriber", skip(self))]
    async fn delete(&self, email: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM emails WHERE email = ?")
            .bind(email)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch a page of subscribers", skip(self))]
    async fn get_page(&self, page: PageRequest) -> Result<Vec<SubscriberEntry>, StoreError> {
        // An offset beyond i64 is beyond any table as well.
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let limit = i64::from(page.count);

        let rows = sqlx::query(
            r#"
            SELECT id, email, confirmed_at, opt_out
            FROM emails
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<SubscriberEntry, StoreError> {
    let confirmed_at: Option<i64> = row.try_get("confirmed_at")?;

    Ok(SubscriberEntry {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        confirmed_at: confirmed_at.map(timestamp_from_secs).transpose()?,
        opt_out: row.try_get("opt_out")?,
    })
}

fn timestamp_from_secs(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(StoreError::InvalidTimestamp(secs))
}
