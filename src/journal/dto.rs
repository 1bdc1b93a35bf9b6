use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::journal::repo_types::JournalEntry;

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: SortOrder,
}

/// Targets of a batch operation: every entry, or the listed ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

impl Selection {
    #[cfg(test)]
    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            all: false,
            ids: ids.into_iter().collect(),
        }
    }

    #[cfg(test)]
    pub fn all() -> Self {
        Self {
            all: true,
            ids: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub affected: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Pdf,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub recipient: String,
    #[serde(flatten)]
    pub selection: Selection,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: JournalEntry,
    pub sentiment_label: String,
}

impl From<JournalEntry> for EntryView {
    fn from(entry: JournalEntry) -> Self {
        let sentiment_label = entry.sentiment_label();
        Self {
            entry,
            sentiment_label,
        }
    }
}
