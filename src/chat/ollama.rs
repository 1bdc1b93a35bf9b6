use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::ChatModel;
use crate::config::OllamaConfig;
use crate::error::{AppError, AppResult};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
}

/// Joins the `response` fragments of a newline-delimited JSON stream.
/// Chunk boundaries need not align with lines; malformed lines are skipped.
#[derive(Debug, Default)]
pub struct NdjsonReply {
    pending: Vec<u8>,
    reply: String,
    skipped: usize,
}

impl NdjsonReply {
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.take_line(&line[..line.len() - 1]);
        }
    }

    fn take_line(&mut self, line: &[u8]) {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match serde_json::from_slice::<GenerateChunk>(line) {
            Ok(chunk) => {
                if let Some(text) = chunk.response {
                    self.reply.push_str(&text);
                }
            }
            Err(_) => self.skipped += 1,
        }
    }

    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.take_line(&rest);
        if self.skipped > 0 {
            warn!(skipped = self.skipped, "malformed model output lines ignored");
        }
        self.reply
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .url
            .trim_end_matches('/')
            .trim_end_matches("/api/generate")
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }

    /// Check if Ollama is reachable.
    pub async fn health_check(&self) -> anyhow::Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Cannot connect to Ollama at {}: {}", self.base_url, e))?
            .error_for_status()?;
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };

        debug!(model = %self.model, "sending request to Ollama");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("Ollama returned status {}", response.status()));
        }

        let mut reply = NdjsonReply::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            reply.push(&chunk);
        }
        Ok(reply.finish())
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.generate(prompt)
            .await
            .map_err(|e| AppError::ExternalService(format!("Error connecting to Ollama: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_fragments_across_chunk_boundaries() {
        let mut r = NdjsonReply::default();
        r.push(br#"{"response":"Breathe"#);
        r.push(b"\"}\n{\"response\":\" slowly\"}\n");
        r.push(br#"{"response":".","done":true}"#);
        assert_eq!(r.finish(), "Breathe slowly.");
    }

    #[test]
    fn skips_malformed_and_empty_lines() {
        let mut r = NdjsonReply::default();
        r.push(b"{\"response\":\"a\"}\n\nnot json\n{\"done\":true}\n{\"response\":\"b\"}\n");
        assert_eq!(r.finish(), "ab");
    }

    #[test]
    fn normalizes_base_url() {
        let client = OllamaClient::new(&OllamaConfig {
            url: "http://localhost:11434/api/generate".into(),
            model: "mistral".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_external_failure() {
        let client = OllamaClient::new(&OllamaConfig {
            url: "http://127.0.0.1:9".into(),
            model: "mistral".into(),
            timeout_secs: 2,
        })
        .unwrap();
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert!(err.to_string().starts_with("Error connecting to Ollama: "));
    }
}
