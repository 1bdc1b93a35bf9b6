//! Journal entry lifecycle: `Active -> Trashed -> Active | gone`.

use std::collections::HashSet;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::journal::{
    dto::{Selection, SortOrder},
    repo::EntryStore,
    repo_types::{EntryTimestamp, JournalEntry},
};
use crate::sentiment::SentimentTagger;
use crate::state::AppState;

impl Selection {
    /// Ids in `collection` named by this selection, in collection order.
    pub fn resolve(&self, collection: &[JournalEntry]) -> HashSet<Uuid> {
        if self.all {
            return collection.iter().map(|e| e.id).collect();
        }
        let wanted: HashSet<Uuid> = self.ids.iter().copied().collect();
        collection
            .iter()
            .map(|e| e.id)
            .filter(|id| wanted.contains(id))
            .collect()
    }
}

/// Stable sort; equal keys keep their stored order in both directions.
pub fn sort_entries(entries: &mut [JournalEntry], order: SortOrder) {
    match order {
        SortOrder::Newest => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        SortOrder::Oldest => entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortOrder::TitleAsc => {
            entries.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
        SortOrder::TitleDesc => {
            entries.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
    }
}

/// Split `from` into (kept, taken) by membership in `ids`, preserving order.
fn take_selected(
    from: Vec<JournalEntry>,
    ids: &HashSet<Uuid>,
) -> (Vec<JournalEntry>, Vec<JournalEntry>) {
    from.into_iter().partition(|e| !ids.contains(&e.id))
}

fn nothing_selected() -> AppError {
    AppError::validation("No entries selected")
}

/// Journal operations for one authenticated user, built per request.
pub struct Journal<'a> {
    entries: &'a EntryStore,
    tagger: &'a dyn SentimentTagger,
    user_id: Uuid,
}

impl<'a> Journal<'a> {
    pub fn new(state: &'a AppState, user_id: Uuid) -> Self {
        Self::with_parts(&state.entries, state.tagger.as_ref(), user_id)
    }

    pub fn with_parts(
        entries: &'a EntryStore,
        tagger: &'a dyn SentimentTagger,
        user_id: Uuid,
    ) -> Self {
        Self {
            entries,
            tagger,
            user_id,
        }
    }

    #[instrument(skip(self, content, title), fields(user_id = %self.user_id))]
    pub async fn create(&self, content: &str, title: Option<&str>) -> AppResult<JournalEntry> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Please write something before saving!"));
        }
        let score = self.tagger.analyze(content);
        let timestamp = EntryTimestamp::now();
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Entry {}", timestamp),
        };

        let _guard = self.entries.lock().await;
        let mut active = self.entries.load_active(self.user_id).await;
        let trash = self.entries.load_trash(self.user_id).await;

        let mut id = Uuid::new_v4();
        while active.iter().chain(trash.iter()).any(|e| e.id == id) {
            id = Uuid::new_v4();
        }
        let entry = JournalEntry {
            id,
            title,
            timestamp,
            content: content.to_string(),
            sentiment: Some(score.label),
        };
        active.push(entry.clone());
        self.entries.save_active(self.user_id, &active).await?;

        info!(entry_id = %entry.id, sentiment = %score.label, polarity = score.polarity, "entry saved");
        Ok(entry)
    }

    pub async fn list(&self, order: SortOrder) -> Vec<JournalEntry> {
        let mut active = self.entries.load_active(self.user_id).await;
        sort_entries(&mut active, order);
        active
    }

    /// Active entries in stored order.
    pub async fn list_unsorted(&self) -> Vec<JournalEntry> {
        self.entries.load_active(self.user_id).await
    }

    pub async fn list_trash(&self) -> Vec<JournalEntry> {
        self.entries.load_trash(self.user_id).await
    }

    /// Look an entry up in the active collection, then in the trash.
    pub async fn find(&self, id: Uuid) -> AppResult<JournalEntry> {
        let active = self.entries.load_active(self.user_id).await;
        if let Some(e) = active.into_iter().find(|e| e.id == id) {
            return Ok(e);
        }
        self.entries
            .load_trash(self.user_id)
            .await
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound("Entry not found".into()))
    }

    #[instrument(skip(self, selection), fields(user_id = %self.user_id))]
    pub async fn move_to_trash(&self, selection: &Selection) -> AppResult<usize> {
        let _guard = self.entries.lock().await;
        let active = self.entries.load_active(self.user_id).await;
        // Existing trash is always merged, never replaced.
        let mut trash = self.entries.load_trash(self.user_id).await;

        let ids = selection.resolve(&active);
        if ids.is_empty() {
            return Err(nothing_selected());
        }
        let (active, moved) = take_selected(active, &ids);
        let count = moved.len();
        trash.extend(moved);
        self.entries.save_both(self.user_id, &active, &trash).await?;

        info!(count, "entries moved to trash");
        Ok(count)
    }

    #[instrument(skip(self, selection), fields(user_id = %self.user_id))]
    pub async fn restore(&self, selection: &Selection) -> AppResult<usize> {
        let _guard = self.entries.lock().await;
        let mut active = self.entries.load_active(self.user_id).await;
        let trash = self.entries.load_trash(self.user_id).await;

        let ids = selection.resolve(&trash);
        if ids.is_empty() {
            return Err(nothing_selected());
        }
        let (trash, restored) = take_selected(trash, &ids);
        let count = restored.len();
        active.extend(restored);
        self.entries.save_both(self.user_id, &active, &trash).await?;

        info!(count, "entries restored");
        Ok(count)
    }

    #[instrument(skip(self, selection), fields(user_id = %self.user_id))]
    pub async fn delete_permanently(&self, selection: &Selection) -> AppResult<usize> {
        let _guard = self.entries.lock().await;
        let trash = self.entries.load_trash(self.user_id).await;

        let ids = selection.resolve(&trash);
        if ids.is_empty() {
            return Err(nothing_selected());
        }
        let (trash, deleted) = take_selected(trash, &ids);
        self.entries.save_trash(self.user_id, &trash).await?;

        info!(count = deleted.len(), "entries permanently deleted");
        Ok(deleted.len())
    }

    /// Entries to email: `all` means every active entry; listed ids may come
    /// from either collection.
    pub async fn resolve_any(&self, selection: &Selection) -> AppResult<Vec<JournalEntry>> {
        let active = self.entries.load_active(self.user_id).await;
        let picked: Vec<JournalEntry> = if selection.all {
            active
        } else {
            let trash = self.entries.load_trash(self.user_id).await;
            let ids: HashSet<Uuid> = selection.ids.iter().copied().collect();
            active
                .into_iter()
                .chain(trash)
                .filter(|e| ids.contains(&e.id))
                .collect()
        };
        if picked.is_empty() {
            return Err(nothing_selected());
        }
        Ok(picked)
    }
}
