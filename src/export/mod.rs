//! Downloadable renderings of journal entries.

use crate::journal::repo_types::JournalEntry;

pub mod archive;
pub mod pdf;

pub const ARCHIVE_FILE_NAME: &str = "journal_entries.zip";
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Plain-text rendering, also used as the email body.
pub fn render_text(entry: &JournalEntry) -> String {
    format!(
        "Title: {}\nDate: {}\n\n{}",
        entry.title, entry.timestamp, entry.content
    )
}

/// `<title>.<ext>` with path separators and control characters replaced.
pub fn file_name(title: &str, ext: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "entry".to_string()
    } else {
        stem
    };
    format!("{}.{}", stem, ext)
}
