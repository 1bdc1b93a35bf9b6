use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::sentiment::Sentiment;

time::serde::format_description!(
    entry_timestamp_format,
    PrimitiveDateTime,
    "[year]-[month]-[day] [hour]-[minute]-[second]"
);

/// Creation time with one-second resolution, stored as `YYYY-MM-DD HH-MM-SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryTimestamp(#[serde(with = "entry_timestamp_format")] PrimitiveDateTime);

impl EntryTimestamp {
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        let at = PrimitiveDateTime::new(now.date(), now.time());
        Self(at.replace_nanosecond(0).unwrap_or(at))
    }

    #[cfg(test)]
    pub fn from_datetime(at: PrimitiveDateTime) -> Self {
        Self(at)
    }
}

impl std::fmt::Display for EntryTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self
            .0
            .format(format_description!(
                "[year]-[month]-[day] [hour]-[minute]-[second]"
            ))
            .map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}

/// One journal entry, identical in the active and trash collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: Uuid,
    pub title: String,
    pub timestamp: EntryTimestamp,
    pub content: String,
    // Older records may lack a tag; it is never recomputed.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

impl JournalEntry {
    pub fn sentiment_label(&self) -> String {
        self.sentiment
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
