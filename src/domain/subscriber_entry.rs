use chrono::{DateTime, Utc};

/// A single mailing-list record.
///
/// `id` is assigned by the store and never changes. `email` is unique and is the
/// key used by lookups, updates and deletes. A missing `confirmed_at` marks a
/// subscriber whose address has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubscriberEntry {
    /// Ignored on updates, which are keyed by `email`.
    #[serde(default)]
    pub id: i64,
    pub email: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub opt_out: bool,
}

impl SubscriberEntry {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}
