//! Mindfulness conversation with a local language model.

use async_trait::async_trait;
use axum::Router;

use crate::error::AppResult;
use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod ollama;
pub mod repo;
pub mod services;

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}

#[cfg(test)]
pub use canned::CannedModel;

#[cfg(test)]
mod canned {
    use async_trait::async_trait;

    use super::ChatModel;
    use crate::error::{AppError, AppResult};

    /// Answers every prompt with the same reply, or fails.
    pub struct CannedModel(pub Option<String>);

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            self.0.clone().ok_or_else(|| {
                AppError::ExternalService("Error connecting to Ollama: connection refused".into())
            })
        }
    }
}
