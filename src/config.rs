//! Service configuration from environment variables

use std::time::Duration;

pub const DEFAULT_WHATSAPP_API_BASE: &str = "https://graph.facebook.com/v17.0";
pub const DEFAULT_TEMPLATE_CLIENT_ID: &str = "923408957390";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    // WhatsApp Cloud API
    pub whatsapp_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
    /// Token the provider echoes back during webhook verification
    pub whatsapp_verify_token: Option<String>,
    pub whatsapp_api_base: String,

    // Caption generation
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    // Stock media
    pub pexels_api_key: Option<String>,
    pub unsplash_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,
    /// Providers tried in this order; first non-empty result wins
    pub media_provider_order: Vec<String>,

    // Rendering
    pub switchboard_api_key: Option<String>,
    pub switchboard_base_url: Option<String>,
    pub template_client_id: String,

    /// SQLite file for sessions; unset keeps sessions in memory
    pub session_db_path: Option<String>,
    pub collaborator_timeout: Duration,
    pub max_pending_messages: usize,
    pub error_log_capacity: usize,
    pub media_candidates: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            whatsapp_token: None,
            whatsapp_phone_number_id: None,
            whatsapp_verify_token: None,
            whatsapp_api_base: DEFAULT_WHATSAPP_API_BASE.to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: None,
            pexels_api_key: None,
            unsplash_api_key: None,
            pixabay_api_key: None,
            media_provider_order: vec![
                "pexels".to_string(),
                "unsplash".to_string(),
                "pixabay".to_string(),
            ],
            switchboard_api_key: None,
            switchboard_base_url: None,
            template_client_id: DEFAULT_TEMPLATE_CLIENT_ID.to_string(),
            session_db_path: None,
            collaborator_timeout: Duration::from_secs(30),
            max_pending_messages: 20,
            error_log_capacity: 256,
            media_candidates: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| -> Option<u64> {
            let raw = var(key)?;
            match raw.trim().parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Ignoring non-numeric setting");
                    None
                }
            }
        };
        let defaults = Self::default();

        Self {
            port: number("POSTPILOT_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            whatsapp_token: var("WHATSAPP_TOKEN"),
            whatsapp_phone_number_id: var("WHATSAPP_PHONE_NUMBER_ID"),
            whatsapp_verify_token: var("WHATSAPP_VERIFY_TOKEN"),
            whatsapp_api_base: var("WHATSAPP_API_BASE").unwrap_or(defaults.whatsapp_api_base),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: var("OPENAI_BASE_URL"),
            pexels_api_key: var("PEXELS_API_KEY"),
            unsplash_api_key: var("UNSPLASH_API_KEY"),
            pixabay_api_key: var("PIXABAY_API_KEY"),
            media_provider_order: var("MEDIA_PROVIDER_ORDER")
                .map(|order| {
                    order
                        .split(',')
                        .map(|p| p.trim().to_lowercase())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.media_provider_order),
            switchboard_api_key: var("SWITCHBOARD_API_KEY"),
            switchboard_base_url: var("SWITCHBOARD_BASE_URL"),
            template_client_id: var("TEMPLATE_CLIENT_ID").unwrap_or(defaults.template_client_id),
            session_db_path: var("SESSION_DB_PATH"),
            collaborator_timeout: number("COLLABORATOR_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map_or(defaults.collaborator_timeout, Duration::from_secs),
            max_pending_messages: count(number("MAX_PENDING_MESSAGES"))
                .unwrap_or(defaults.max_pending_messages),
            error_log_capacity: count(number("ERROR_LOG_CAPACITY"))
                .unwrap_or(defaults.error_log_capacity),
            media_candidates: count(number("MEDIA_CANDIDATES")).unwrap_or(defaults.media_candidates),
        }
    }

    /// Names of API keys that are not set, for startup warnings
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let keys = [
            ("WHATSAPP_TOKEN", &self.whatsapp_token),
            ("WHATSAPP_PHONE_NUMBER_ID", &self.whatsapp_phone_number_id),
            ("WHATSAPP_VERIFY_TOKEN", &self.whatsapp_verify_token),
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("PEXELS_API_KEY", &self.pexels_api_key),
            ("UNSPLASH_API_KEY", &self.unsplash_api_key),
            ("PIXABAY_API_KEY", &self.pixabay_api_key),
            ("SWITCHBOARD_API_KEY", &self.switchboard_api_key),
        ];
        keys.into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name)
            .collect()
    }
}

/// Positive counts only
fn count(value: Option<u64>) -> Option<usize> {
    value
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
}
