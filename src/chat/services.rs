use tracing::{info, instrument};
use uuid::Uuid;

use crate::chat::{dto::ChatTurn, repo::ChatHistoryStore, ChatModel};
use crate::error::{AppError, AppResult};
use crate::sentiment::{SentimentScore, SentimentTagger};

const MINDFULNESS_PROMPT: &str = "\
You are 'The Mind Partner' - a thoughtful AI designed to guide users
through mindfulness, self-awareness, and mental well-being.

When responding, focus on:
- Encouraging mindfulness and self-reflection
- Providing practical meditation and relaxation techniques
- Offering perspective shifts to reduce stress and anxiety
- Promoting gratitude, positivity, and emotional balance

Be warm, empathetic, and inspiring.
If the user is anxious, gently guide them towards calmness.
If they are curious, provide insightful mindfulness teachings.

Here's the user's question:
";

pub fn build_prompt(user_text: &str) -> String {
    format!("{}{}", MINDFULNESS_PROMPT, user_text)
}

/// Ask the model and record the exchange. History is only written on success.
#[instrument(skip(model, tagger, history, prompt))]
pub async fn ask(
    model: &dyn ChatModel,
    tagger: &dyn SentimentTagger,
    history: &ChatHistoryStore,
    user_id: Uuid,
    prompt: &str,
) -> AppResult<(String, SentimentScore)> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::validation("Please enter a question first."));
    }

    let reply = model.complete(&build_prompt(prompt)).await?;
    let score = tagger.analyze(&reply);
    history
        .append(
            user_id,
            ChatTurn {
                user: prompt.to_string(),
                bot: reply.clone(),
            },
        )
        .await?;

    info!(reply_len = reply.len(), sentiment = %score.label, "chat reply recorded");
    Ok((reply, score))
}
