use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// OAuth client used to obtain delegated send rights on the mail API.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub sender: String,
    pub send_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_dir: String,
    pub jwt: JwtConfig,
    pub ollama: OllamaConfig,
    pub mail: Option<MailConfig>,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: var_or("JWT_ISSUER", "mindpartner"),
            audience: var_or("JWT_AUDIENCE", "mindpartner-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let ollama = OllamaConfig {
            url: var_or("OLLAMA_URL", "http://localhost:11434"),
            model: var_or("OLLAMA_MODEL", "mistral"),
            timeout_secs: parsed_or("OLLAMA_TIMEOUT_SECS", 120),
        };
        let mail = match (
            std::env::var("MAIL_CLIENT_ID"),
            std::env::var("MAIL_CLIENT_SECRET"),
            std::env::var("MAIL_REFRESH_TOKEN"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(refresh_token)) => Some(MailConfig {
                sender: var_or("MAIL_SENDER", "me"),
                send_url: var_or(
                    "MAIL_SEND_URL",
                    "https://gmail.googleapis.com/gmail/v1/users/me/messages/send",
                ),
                token_url: var_or("MAIL_TOKEN_URL", "https://oauth2.googleapis.com/token"),
                client_id,
                client_secret,
                refresh_token,
            }),
            _ => None,
        };
        Ok(Self {
            data_dir: var_or("DATA_DIR", "./data"),
            jwt,
            ollama,
            mail,
        })
    }
}
