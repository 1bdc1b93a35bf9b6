use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::{AppError, AppResult};
use crate::export::{file_name, pdf::render_pdf, render_text, METADATA_FILE_NAME};
use crate::journal::repo_types::JournalEntry;

fn zip_error(e: impl std::fmt::Display) -> AppError {
    AppError::ExternalService(format!("failed to build archive: {}", e))
}

/// Hands out archive member names, appending ` (n)` to repeats.
#[derive(Default)]
struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    fn claim(&mut self, title: &str, ext: &str) -> String {
        let mut name = file_name(title, ext);
        let mut n = 1;
        while self.taken.contains(&name) {
            name = file_name(&format!("{} ({})", title.trim(), n), ext);
            n += 1;
        }
        self.taken.insert(name.clone());
        name
    }
}

/// ZIP of `metadata.json` plus a text and a PDF rendering of every entry.
pub fn build_archive(entries: &[JournalEntry]) -> AppResult<Vec<u8>> {
    if entries.is_empty() {
        return Err(AppError::NotFound("No entries found to download.".into()));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut names = NameAllocator::default();
    names.taken.insert(METADATA_FILE_NAME.to_string());

    zip.start_file(METADATA_FILE_NAME, options).map_err(zip_error)?;
    zip.write_all(&serde_json::to_vec_pretty(entries)?)
        .map_err(zip_error)?;

    for entry in entries {
        zip.start_file(names.claim(&entry.title, "txt"), options)
            .map_err(zip_error)?;
        zip.write_all(render_text(entry).as_bytes())
            .map_err(zip_error)?;

        let pdf = render_pdf(entry)?;
        zip.start_file(names.claim(&entry.title, "pdf"), options)
            .map_err(zip_error)?;
        zip.write_all(&pdf).map_err(zip_error)?;
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::repo_types::EntryTimestamp;
    use std::io::Read;
    use uuid::Uuid;

    fn entry(title: &str, content: &str) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            title: title.into(),
            timestamp: EntryTimestamp::now(),
            content: content.into(),
            sentiment: None,
        }
    }

    #[test]
    fn empty_collection_is_not_found() {
        assert!(matches!(build_archive(&[]), Err(AppError::NotFound(_))));
    }

    #[test]
    fn duplicate_titles_are_disambiguated() {
        let entries = [entry("Day", "one"), entry("Day", "two"), entry("a/b", "three")];
        let bytes = build_archive(&entries).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            [
                "Day (1).pdf",
                "Day (1).txt",
                "Day.pdf",
                "Day.txt",
                "a_b.pdf",
                "a_b.txt",
                "metadata.json",
            ]
        );

        let mut second = String::new();
        archive
            .by_name("Day (1).txt")
            .unwrap()
            .read_to_string(&mut second)
            .unwrap();
        assert!(second.ends_with("\n\ntwo"));

        let mut meta = String::new();
        archive
            .by_name("metadata.json")
            .unwrap()
            .read_to_string(&mut meta)
            .unwrap();
        let parsed: Vec<JournalEntry> = serde_json::from_str(&meta).unwrap();
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn entry_titled_metadata_does_not_clobber_it() {
        let mut names = NameAllocator::default();
        names.taken.insert(METADATA_FILE_NAME.to_string());
        assert_eq!(names.claim("metadata", "json"), "metadata (1).json");
    }
}
