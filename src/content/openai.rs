//! `OpenAI` chat-completions content generator

use super::{ContentGenerator, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

const SERVICE: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CAPTION_SYSTEM_PROMPT: &str =
    "You are a marketing expert. Create engaging social media captions.";

const TEMPLATE_SYSTEM_PROMPT: &str = "You are a marketing expert writing social media captions \
for a branded post template. Keep it under 60 words, end with two or three relevant hashtags, \
and do not repeat the headline verbatim.";

const QUERY_SYSTEM_PROMPT: &str = "You are a marketing expert. Create a search query for \
finding relevant images. Just return the search query for platform like Unsplash nothing else.";

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: String, base_url: Option<&str>, timeout: Duration) -> Self {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            model,
            endpoint: format!("{base}/chat/completions"),
        }
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: 300,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;
        first_choice(body)
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate_caption(&self, prompt: &str) -> Result<String, ServiceError> {
        self.complete(
            CAPTION_SYSTEM_PROMPT,
            format!("Create an engaging caption for: {prompt}"),
        )
        .await
    }

    async fn generate_template_caption(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        self.complete(
            TEMPLATE_SYSTEM_PROMPT,
            format!(
                "Write a caption for a {template_type} post.\n{}",
                describe_fields(fields)
            ),
        )
        .await
    }

    async fn generate_search_query(
        &self,
        template_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        let query = self
            .complete(
                QUERY_SYSTEM_PROMPT,
                format!(
                    "Post type: {template_type}\n{}",
                    describe_fields(fields)
                ),
            )
            .await?;
        Ok(query.trim_matches(|c: char| c == '"' || c.is_whitespace()).to_string())
    }
}

fn describe_fields(fields: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (name, value) in fields {
        let _ = writeln!(out, "{}: {value}", name.replace('_', " "));
    }
    out
}

fn first_choice(body: ChatResponse) -> Result<String, ServiceError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ServiceError::invalid_response(SERVICE, "response contained no text"))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
