//! Persistence for subscriber entries.
//!
//! Transports only ever talk to [`SubscriberStore`]; the SQLite implementation
//! lives in [`sqlite`].

pub mod sqlite;

use async_trait::async_trait;

use crate::domain::page_request::PageRequest;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_entry::SubscriberEntry;

pub use sqlite::SqliteStore;

/// Store contract shared by both transports. Implementations must be safe to
/// call concurrently; every operation is a single independent call.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Creates the schema when it does not exist yet. Idempotent.
    async fn create_if_absent(&self) -> Result<(), StoreError>;

    /// Inserts a pending subscriber that has not opted out.
    async fn create(&self, email: &SubscriberEmail) -> Result<(), StoreError>;

    /// `Ok(None)` means no entry uses this address.
    async fn get_one(&self, email: &str) -> Result<Option<SubscriberEntry>, StoreError>;

    /// Overwrites confirmation and opt-out of the entry stored under `entry.email`.
    /// Unknown addresses are left alone: nothing is inserted.
    async fn update(&self, entry: &SubscriberEntry) -> Result<(), StoreError>;

    async fn delete(&self, email: &str) -> Result<(), StoreError>;

    /// Entries ordered by id. A page past the end is empty.
    async fn get_page(&self, page: PageRequest) -> Result<Vec<SubscriberEntry>, StoreError>;
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open the subscriber store: {0}")]
    ConnectError(#[source] sqlx::Error),
    #[error(transparent)]
    QueryError(#[from] sqlx::Error),
    #[error("{0} is not a valid confirmation timestamp")]
    InvalidTimestamp(i64),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}
