use crate::auth::repo::UserStore;
use crate::chat::{ollama::OllamaClient, repo::ChatHistoryStore, ChatModel};
use crate::config::AppConfig;
use crate::journal::repo::EntryStore;
use crate::mindfulness::course::CourseStore;
use crate::notify::{
    credentials::OAuthRefreshProvider, gmail::GmailMailer, DisabledMailer, Mailer,
};
use crate::preferences::PreferenceStore;
use crate::sentiment::{LexiconTagger, SentimentTagger};
use crate::storage::{FsStorage, StorageClient};
use axum::extract::FromRef;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserStore>,
    pub entries: Arc<EntryStore>,
    pub chat_history: Arc<ChatHistoryStore>,
    pub preferences: Arc<PreferenceStore>,
    pub course: Arc<CourseStore>,
    pub tagger: Arc<dyn SentimentTagger>,
    pub model: Arc<dyn ChatModel>,
    pub mailer: Arc<dyn Mailer>,
}

impl FromRef<AppState> for Arc<UserStore> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        tokio::fs::create_dir_all(&config.data_dir).await?;
        let storage = Arc::new(FsStorage::new(&config.data_dir)) as Arc<dyn StorageClient>;

        let ollama = OllamaClient::new(&config.ollama)?;
        // The model may come up after us; chat requests fail until it does.
        if let Err(e) = ollama.health_check().await {
            warn!(error = %e, "Ollama is not reachable; chat will be unavailable");
        }

        let mailer = match &config.mail {
            Some(mail) => {
                let credentials = Arc::new(OAuthRefreshProvider::new(mail)?);
                info!(sender = %mail.sender, "email delivery enabled");
                Arc::new(GmailMailer::new(mail, credentials)?) as Arc<dyn Mailer>
            }
            None => {
                warn!("mail credentials not set; email delivery disabled");
                Arc::new(DisabledMailer) as Arc<dyn Mailer>
            }
        };

        Ok(Self::from_parts(
            config,
            storage,
            Arc::new(LexiconTagger),
            Arc::new(ollama),
            mailer,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        tagger: Arc<dyn SentimentTagger>,
        model: Arc<dyn ChatModel>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users: Arc::new(UserStore::new(storage.clone())),
            entries: Arc::new(EntryStore::new(storage.clone())),
            chat_history: Arc::new(ChatHistoryStore::new(storage.clone())),
            preferences: Arc::new(PreferenceStore::new(storage.clone())),
            course: Arc::new(CourseStore::new(storage.clone())),
            config,
            tagger,
            model,
            mailer,
        }
    }

    /// In-memory state with a canned model reply and a recording mailer.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(
            Arc::new(crate::chat::CannedModel(Some(
                "Take a slow, calm breath. You are doing wonderful work.".into(),
            ))),
            Arc::new(crate::notify::RecordingMailer::default()),
        )
    }

    #[cfg(test)]
    pub fn fake_with(model: Arc<dyn ChatModel>, mailer: Arc<dyn Mailer>) -> Self {
        let config = Arc::new(AppConfig {
            data_dir: "unused".into(),
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            ollama: crate::config::OllamaConfig {
                url: "http://127.0.0.1:9".into(),
                model: "mistral".into(),
                timeout_secs: 1,
            },
            mail: None,
        });
        let storage = Arc::new(crate::storage::MemoryStorage::default()) as Arc<dyn StorageClient>;
        Self::from_parts(config, storage, Arc::new(LexiconTagger), model, mailer)
    }
}
