//! Webhook envelope normalisation
//!
//! The provider posts a nested envelope; the engine only wants
//! `(sender_id, text)` pairs. Button and list replies resolve to the reply id,
//! uploads resolve to a `[media:<type>:<id>]` marker.

use super::MediaKind;
use serde::Deserialize;

/// `object` value carried by WhatsApp Business webhooks
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    pub from: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub text: Option<TextBody>,
    pub interactive: Option<Interactive>,
    pub image: Option<MediaBody>,
    pub video: Option<MediaBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct Interactive {
    pub button_reply: Option<Reply>,
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Deserialize)]
pub struct Reply {
    pub id: String,
    #[allow(dead_code)] // Only the id is routed
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaBody {
    pub id: String,
}

/// A normalised inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
}

impl WebhookEnvelope {
    pub fn is_business_account(&self) -> bool {
        self.object == BUSINESS_ACCOUNT_OBJECT
    }

    /// Number of delivery/read status callbacks in the envelope
    pub fn status_count(&self) -> usize {
        self.changes().map(|v| v.statuses.len()).sum()
    }

    /// Flatten every supported message in the envelope, in delivery order
    pub fn normalize(&self) -> Vec<InboundMessage> {
        self.changes()
            .flat_map(|v| v.messages.iter())
            .filter_map(|raw| {
                let text = raw.to_text()?;
                Some(InboundMessage {
                    sender_id: raw.from.clone(),
                    text,
                })
            })
            .collect()
    }

    fn changes(&self) -> impl Iterator<Item = &ChangeValue> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .map(|c| &c.value)
    }
}

impl RawMessage {
    fn to_text(&self) -> Option<String> {
        match self.kind.as_str() {
            "text" => self.text.as_ref().map(|t| t.body.clone()),
            "interactive" => {
                let interactive = self.interactive.as_ref()?;
                interactive
                    .button_reply
                    .as_ref()
                    .or(interactive.list_reply.as_ref())
                    .map(|r| r.id.clone())
            }
            "image" => self
                .image
                .as_ref()
                .map(|m| MediaRef::new(MediaKind::Image, &m.id).marker()),
            "video" => self
                .video
                .as_ref()
                .map(|m| MediaRef::new(MediaKind::Video, &m.id).marker()),
            other => {
                tracing::debug!(sender = %self.from, kind = other, "Ignoring unsupported message type");
                None
            }
        }
    }
}

/// Reference to media the user uploaded, carried through the text pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub media_id: String,
}

impl MediaRef {
    pub fn new(kind: MediaKind, media_id: impl Into<String>) -> Self {
        Self {
            kind,
            media_id: media_id.into(),
        }
    }

    pub fn marker(&self) -> String {
        format!("[media:{}:{}]", self.kind.as_str(), self.media_id)
    }

    /// Recover a media reference from a marker string
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix("[media:")?.strip_suffix(']')?;
        let (kind, media_id) = inner.split_once(':')?;
        if media_id.is_empty() {
            return None;
        }
        Some(Self::new(MediaKind::parse(kind)?, media_id))
    }
}
