//! Per-user display theme and accent colour.

use std::sync::Arc;

use axum::Router;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::journal::repo::user_key;
use crate::state::AppState;
use crate::storage::{load_json, save_json, StorageClient};

pub mod handlers;

pub const DEFAULT_PRIMARY_COLOR: &str = "#4CAF50";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub sidebar: &'static str,
    pub widget: &'static str,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: "#121212",
                text: "#FFFFFF",
                sidebar: "#333333",
                widget: "#2E2E2E",
            },
            Theme::Light => Palette {
                background: "#E8F5E9",
                text: "#2E7D32",
                sidebar: "#C8E6C9",
                widget: "#FFFFFF",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
}

fn default_primary_color() -> String {
    DEFAULT_PRIMARY_COLOR.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            primary_color: default_primary_color(),
        }
    }
}

pub fn validate_color(color: &str) -> AppResult<()> {
    lazy_static! {
        static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
    }
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(AppError::validation(
            "Primary color must be a hex colour like #4CAF50",
        ))
    }
}

pub struct PreferenceStore {
    storage: Arc<dyn StorageClient>,
    lock: Mutex<()>,
}

impl PreferenceStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    pub async fn load(&self, user_id: Uuid) -> Preferences {
        load_json(self.storage.as_ref(), &user_key(user_id, "preferences.json")).await
    }

    pub async fn save(&self, user_id: Uuid, prefs: &Preferences) -> AppResult<()> {
        validate_color(&prefs.primary_color)?;
        let _guard = self.lock.lock().await;
        save_json(
            self.storage.as_ref(),
            &user_key(user_id, "preferences.json"),
            prefs,
        )
        .await
    }
}

pub fn router() -> Router<AppState> {
    handlers::preference_routes()
}
