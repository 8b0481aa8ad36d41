//! WhatsApp Cloud API adapter

use super::{Button, ListSection, MediaItem, MessagingError, Messenger};
use crate::content::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SERVICE: &str = "whatsapp";

/// Provider limit on button and row titles
pub const MAX_TITLE_CHARS: usize = 20;

/// Error code returned when a test number is not on the allowed list
const RECIPIENT_NOT_ALLOWED: i64 = 131_030;

pub struct WhatsAppClient {
    client: Client,
    token: String,
    api_base: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    pub fn new(token: String, phone_number_id: String, api_base: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            phone_number_id,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base, self.phone_number_id)
    }

    async fn post(&self, user_id: &str, what: &str, payload: &Value) -> Result<(), MessagingError> {
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| MessagingError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(user_id = %user_id, what, "Sent WhatsApp message");
            return Ok(());
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let (code, message) = api_error(&body);
        if code == RECIPIENT_NOT_ALLOWED.to_string() {
            tracing::error!(
                user_id = %user_id,
                "Recipient not in the allowed test number list"
            );
        }
        tracing::warn!(
            user_id = %user_id,
            what,
            status = status.as_u16(),
            code = %code,
            "WhatsApp API rejected message"
        );
        Err(MessagingError::Rejected { code, message })
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), MessagingError> {
        self.post(user_id, "text", &text_payload(user_id, text)).await
    }

    async fn send_media(&self, user_id: &str, items: &[MediaItem]) -> Result<(), MessagingError> {
        for item in items {
            let payload = media_payload(user_id, item)?;
            self.post(user_id, item.kind.as_str(), &payload).await?;
        }
        Ok(())
    }

    async fn send_reply_buttons(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), MessagingError> {
        self.post(user_id, "buttons", &buttons_payload(user_id, header, body, buttons))
            .await
    }

    async fn send_list(
        &self,
        user_id: &str,
        header: &str,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> Result<(), MessagingError> {
        let payload = list_payload(user_id, header, body, button_label, sections);
        self.post(user_id, "list", &payload).await
    }

    async fn resolve_media(&self, media_id: &str) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct MediaInfo {
            url: String,
        }

        let response = self
            .client
            .get(format!("{}/{media_id}", self.api_base))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), &body));
        }

        let info: MediaInfo = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;
        Ok(info.url)
    }
}

// ============================================================================
// Payload builders
// ============================================================================

fn envelope(user_id: &str, kind: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": user_id,
        "type": kind,
    })
}

fn text_payload(user_id: &str, text: &str) -> Value {
    let mut payload = envelope(user_id, "text");
    payload["text"] = json!({ "preview_url": false, "body": text });
    payload
}

fn media_payload(user_id: &str, item: &MediaItem) -> Result<Value, MessagingError> {
    if !(item.url.starts_with("http://") || item.url.starts_with("https://")) {
        return Err(MessagingError::InvalidMessage(format!(
            "media URL must be absolute: {}",
            item.url
        )));
    }
    let kind = item.kind.as_str();
    let mut media = json!({ "link": item.url });
    if let Some(caption) = &item.caption {
        media["caption"] = json!(caption);
    }
    let mut payload = envelope(user_id, kind);
    payload[kind] = media;
    Ok(payload)
}

fn interactive(user_id: &str, header: &str, mut body: Value) -> Value {
    if !header.is_empty() {
        body["header"] = json!({ "type": "text", "text": header });
    }
    let mut payload = envelope(user_id, "interactive");
    payload["interactive"] = body;
    payload
}

fn buttons_payload(user_id: &str, header: &str, body: &str, buttons: &[Button]) -> Value {
    let buttons: Vec<Value> = buttons
        .iter()
        .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": title(&b.title) } }))
        .collect();
    interactive(
        user_id,
        header,
        json!({
            "type": "button",
            "body": { "text": body },
            "action": { "buttons": buttons },
        }),
    )
}

fn list_payload(
    user_id: &str,
    header: &str,
    body: &str,
    button_label: &str,
    sections: &[ListSection],
) -> Value {
    let sections: Vec<Value> = sections
        .iter()
        .map(|s| {
            let rows: Vec<Value> = s
                .rows
                .iter()
                .map(|r| json!({ "id": r.id, "title": title(&r.title), "description": "" }))
                .collect();
            json!({ "title": title(&s.title), "rows": rows })
        })
        .collect();
    interactive(
        user_id,
        header,
        json!({
            "type": "list",
            "body": { "text": body },
            "action": { "button": title(button_label), "sections": sections },
        }),
    )
}

fn title(text: &str) -> String {
    text.chars().take(MAX_TITLE_CHARS).collect()
}

fn api_error(body: &Value) -> (String, String) {
    let error = &body["error"];
    let code = match &error["code"] {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => "unknown".to_string(),
    };
    let message = error["message"]
        .as_str()
        .unwrap_or("Unknown error")
        .to_string();
    (code, message)
}
