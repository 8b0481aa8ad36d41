//! Switchboard Canvas renderer

use super::{Renderer, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const SERVICE: &str = "switchboard";
pub const DEFAULT_BASE_URL: &str = "https://api.canvas.switchboard.ai";

/// Template elements that take an image or video URL rather than text
const MEDIA_ELEMENTS: [&str; 3] = ["main_image", "event_image", "video_background"];

/// Square post size used for every platform
const POST_SIZE: (u32, u32) = (1080, 1080);

pub struct SwitchboardRenderer {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SwitchboardRenderer {
    pub fn new(api_key: String, base_url: Option<&str>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl Renderer for SwitchboardRenderer {
    async fn render(
        &self,
        template_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("X-API-Key", &self.api_key)
            .json(&render_payload(template_id, fields))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, &e))?;
        asset_url(&body)
    }
}

fn render_payload(template_id: &str, fields: &BTreeMap<String, String>) -> Value {
    let mut elements = Map::new();
    for (name, value) in fields {
        let element = if MEDIA_ELEMENTS.contains(&name.as_str()) {
            json!({ "url": value })
        } else {
            json!({ "text": value })
        };
        elements.insert(name.clone(), element);
    }
    json!({
        "template": template_id,
        "sizes": [{ "width": POST_SIZE.0, "height": POST_SIZE.1 }],
        "elements": elements,
    })
}

fn asset_url(body: &Value) -> Result<String, ServiceError> {
    body["sizes"]
        .as_array()
        .and_then(|sizes| sizes.iter().find_map(|s| s["url"].as_str()))
        .map(str::to_string)
        .ok_or_else(|| ServiceError::invalid_response(SERVICE, "no rendered size in response"))
}
