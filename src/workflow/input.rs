//! Normalised turn input

use crate::messaging::MediaRef;

/// One inbound message as handlers see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Trimmed message text (the media marker for uploads)
    pub text: String,
    pub media: Option<MediaRef>,
    /// Set on hops the workflow makes by itself, never on user messages
    pub automatic: bool,
}

impl Input {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let media = MediaRef::parse(&text);
        Self {
            text,
            media,
            automatic: false,
        }
    }

    /// Input for a state entered without a user message
    pub fn automatic() -> Self {
        Self {
            text: String::new(),
            media: None,
            automatic: true,
        }
    }

    /// Lowercased text for keyword matching
    pub fn keyword(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn is_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Reply number in `1..=max`, if the text is one
    pub fn choice(&self, max: usize) -> Option<usize> {
        self.text
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=max).contains(n))
    }
}
