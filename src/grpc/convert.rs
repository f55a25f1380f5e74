//! Translation between wire messages and domain entries.
//!
//! The wire format has no way to leave `confirmed_at` out, so an unconfirmed
//! entry travels as epoch zero and epoch zero comes back as "not confirmed".
//! An entry really confirmed at 1970-01-01T00:00:00Z therefore reads back as
//! pending.

use chrono::{DateTime, TimeZone, Utc};

use super::proto::EmailEntry;
use crate::domain::subscriber_entry::SubscriberEntry;

pub const UNCONFIRMED_SENTINEL: i64 = 0;

pub fn encode_confirmed_at(confirmed_at: Option<DateTime<Utc>>) -> i64 {
    confirmed_at
        .map(|confirmed_at| confirmed_at.timestamp())
        .unwrap_or(UNCONFIRMED_SENTINEL)
}

pub fn decode_confirmed_at(seconds: i64) -> Result<Option<DateTime<Utc>>, String> {
    if seconds == UNCONFIRMED_SENTINEL {
        return Ok(None);
    }

    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(Some)
        .ok_or_else(|| format!("{} is not a valid confirmation timestamp", seconds))
}

impl From<&SubscriberEntry> for EmailEntry {
    fn from(entry: &SubscriberEntry) -> Self {
        EmailEntry {
            id: entry.id,
            email: entry.email.clone(),
            confirmed_at: encode_confirmed_at(entry.confirmed_at),
            opt_out: entry.opt_out,
        }
    }
}

impl TryFrom<EmailEntry> for SubscriberEntry {
    type Error = String;

    fn try_from(entry: EmailEntry) -> Result<Self, Self::Error> {
        Ok(SubscriberEntry {
            id: entry.id,
            email: entry.email,
            confirmed_at: decode_confirmed_at(entry.confirmed_at)?,
            opt_out: entry.opt_out,
        })
    }
}
