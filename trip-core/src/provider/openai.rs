use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::agent::ToolInvocation;

use super::{Narrator, fetch_json};

const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are a helpful travel planning assistant. \
You receive the results of tool calls that were already made for a city, in order: \
location, weather forecast, air quality, attractions, clothing advice, umbrella check \
and mask check. Write a concise, well organized travel plan from those results only. \
Do not invent data that is not in the tool results.";

/// Narrates agent transcripts through the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiNarrator {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenAiNarrator {
    pub fn new(api_key: String, http: Client, base_url: String) -> Self {
        Self { api_key, http, base_url }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl Narrator for OpenAiNarrator {
    #[instrument(skip(self, transcript), level = "debug")]
    async fn narrate(&self, city: &str, transcript: &[ToolInvocation]) -> Result<String> {
        let results = serde_json::to_string_pretty(transcript)
            .context("Failed to serialize tool transcript")?;

        let body = ChatRequest {
            model: MODEL,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage { role: "system".to_string(), content: Some(SYSTEM_PROMPT.to_string()) },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(format!(
                        "Please provide a complete travel plan for {city}.\n\nTool results:\n{results}"
                    )),
                },
            ],
        };

        let request = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        let value = fetch_json(request, "OpenAI chat completion").await?;
        let parsed: ChatResponse =
            serde_json::from_value(value).context("Failed to parse OpenAI chat completion JSON")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("OpenAI chat completion contained no message"))?;

        debug!(chars = content.len(), "narration received");
        Ok(content)
    }
}
