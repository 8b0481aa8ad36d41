//! Stock media search with ordered provider fallback
//!
//! Providers are tried in configured order; the first non-empty result list
//! wins. A provider error counts as an empty result.

use super::{MediaSearch, ServiceError};
use crate::config::Config;
use crate::messaging::MediaKind;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// A single stock media source
#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Search for media; providers without a catalogue for `kind` return empty
    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError>;
}

/// Ordered fallback over several providers
pub struct ProviderChain {
    providers: Vec<Arc<dyn MediaProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn MediaProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain in `MEDIA_PROVIDER_ORDER`, skipping providers without keys
    pub fn from_config(config: &Config, client: &Client) -> Self {
        let mut providers: Vec<Arc<dyn MediaProvider>> = Vec::new();
        for name in &config.media_provider_order {
            let key = match name.as_str() {
                "pexels" => config.pexels_api_key.clone(),
                "unsplash" => config.unsplash_api_key.clone(),
                "pixabay" => config.pixabay_api_key.clone(),
                other => {
                    tracing::warn!(provider = other, "Unknown media provider in order, skipping");
                    continue;
                }
            };
            let Some(api_key) = key else {
                tracing::warn!(provider = %name, "No API key configured, provider disabled");
                continue;
            };
            let client = client.clone();
            let provider: Arc<dyn MediaProvider> = match name.as_str() {
                "pexels" => Arc::new(PexelsProvider { client, api_key }),
                "unsplash" => Arc::new(UnsplashProvider { client, api_key }),
                _ => Arc::new(PixabayProvider { client, api_key }),
            };
            providers.push(provider);
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn first_non_empty(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Vec<String> {
        for provider in &self.providers {
            match provider.search(kind, query, limit).await {
                Ok(urls) if !urls.is_empty() => {
                    tracing::info!(
                        provider = provider.name(),
                        kind = kind.as_str(),
                        count = urls.len(),
                        "Media search hit"
                    );
                    return urls.into_iter().take(limit).collect();
                }
                Ok(_) => {
                    tracing::debug!(provider = provider.name(), query, "No media results");
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Media provider failed");
                }
            }
        }
        Vec::new()
    }
}

#[async_trait]
impl MediaSearch for ProviderChain {
    async fn search_images(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        Ok(self.first_non_empty(MediaKind::Image, query, limit).await)
    }

    async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        Ok(self.first_non_empty(MediaKind::Video, query, limit).await)
    }
}

// ============================================================================
// Providers
// ============================================================================

async fn get_json(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|e| ServiceError::from_reqwest(service, &e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::from_status(service, status.as_u16(), &body));
    }
    response
        .json()
        .await
        .map_err(|e| ServiceError::from_reqwest(service, &e))
}

fn per_page(limit: usize) -> String {
    limit.max(1).to_string()
}

pub struct PexelsProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl MediaProvider for PexelsProvider {
    fn name(&self) -> &'static str {
        "pexels"
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        let url = match kind {
            MediaKind::Image => "https://api.pexels.com/v1/search",
            MediaKind::Video => "https://api.pexels.com/videos/search",
        };
        let request = self
            .client
            .get(url)
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", &per_page(limit))]);
        let body = get_json(self.name(), request).await?;
        Ok(match kind {
            MediaKind::Image => pexels_photos(&body),
            MediaKind::Video => pexels_videos(&body),
        })
    }
}

pub struct UnsplashProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl MediaProvider for UnsplashProvider {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        if kind == MediaKind::Video {
            return Ok(Vec::new());
        }
        let request = self
            .client
            .get("https://api.unsplash.com/search/photos")
            .header("Accept-Version", "v1")
            .header("Authorization", format!("Client-ID {}", self.api_key))
            .query(&[("query", query), ("per_page", &per_page(limit))]);
        let body = get_json(self.name(), request).await?;
        Ok(unsplash_photos(&body))
    }
}

pub struct PixabayProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl MediaProvider for PixabayProvider {
    fn name(&self) -> &'static str {
        "pixabay"
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        if kind == MediaKind::Video {
            return Ok(Vec::new());
        }
        // Pixabay rejects per_page below 3
        let request = self.client.get("https://pixabay.com/api/").query(&[
            ("key", self.api_key.as_str()),
            ("q", query),
            ("image_type", "photo"),
            ("per_page", &per_page(limit.max(3))),
        ]);
        let body = get_json(self.name(), request).await?;
        Ok(pixabay_photos(&body))
    }
}

// Response parsing

fn collect_strings<'a>(items: Option<&'a Vec<Value>>, pick: impl Fn(&'a Value) -> Option<&'a str>) -> Vec<String> {
    items
        .into_iter()
        .flatten()
        .filter_map(pick)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn pexels_photos(body: &Value) -> Vec<String> {
    collect_strings(body["photos"].as_array(), |p| p["src"]["original"].as_str())
}

fn pexels_videos(body: &Value) -> Vec<String> {
    collect_strings(body["videos"].as_array(), |v| {
        v["video_files"]
            .as_array()?
            .iter()
            .find_map(|f| f["link"].as_str())
    })
}

fn unsplash_photos(body: &Value) -> Vec<String> {
    collect_strings(body["results"].as_array(), |r| r["urls"]["raw"].as_str())
}

fn pixabay_photos(body: &Value) -> Vec<String> {
    collect_strings(body["hits"].as_array(), |h| h["webformatURL"].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedProvider {
        name: &'static str,
        result: Result<Vec<String>, ServiceError>,
    }

    #[async_trait]
    impl MediaProvider for FixedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(
            &self,
            _kind: MediaKind,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<String>, ServiceError> {
            self.result.clone()
        }
    }

    fn provider(name: &'static str, result: Result<Vec<&str>, ServiceError>) -> Arc<dyn MediaProvider> {
        Arc::new(FixedProvider {
            name,
            result: result.map(|urls| urls.into_iter().map(String::from).collect()),
        })
    }

    #[tokio::test]
    async fn first_non_empty_provider_wins() {
        let chain = ProviderChain::new(vec![
            provider("a", Ok(vec![])),
            provider("b", Ok(vec!["https://b/1.jpg", "https://b/2.jpg"])),
            provider("c", Ok(vec!["https://c/1.jpg"])),
        ]);
        let urls = chain.search_images("beach", 4).await.unwrap();
        assert_eq!(urls, vec!["https://b/1.jpg", "https://b/2.jpg"]);
    }

    #[tokio::test]
    async fn provider_errors_count_as_empty() {
        let chain = ProviderChain::new(vec![
            provider("a", Err(ServiceError::network("a", "down"))),
            provider("b", Ok(vec!["https://b/1.jpg"])),
        ]);
        let urls = chain.search_images("beach", 4).await.unwrap();
        assert_eq!(urls, vec!["https://b/1.jpg"]);
    }

    #[tokio::test]
    async fn results_are_capped_at_limit() {
        let chain = ProviderChain::new(vec![provider(
            "a",
            Ok(vec!["1", "2", "3", "4", "5"]),
        )]);
        assert_eq!(chain.search_videos("x", 2).await.unwrap(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn exhausted_chain_is_empty_not_error() {
        let chain = ProviderChain::new(vec![]);
        assert!(chain.search_images("x", 4).await.unwrap().is_empty());
    }

    #[test]
    fn chain_follows_configured_order_and_skips_missing_keys() {
        let config = Config {
            media_provider_order: vec!["pixabay".into(), "pexels".into(), "unsplash".into()],
            pexels_api_key: Some("p".into()),
            unsplash_api_key: None,
            pixabay_api_key: Some("x".into()),
            ..Config::default()
        };
        let chain = ProviderChain::from_config(&config, &Client::new());
        assert_eq!(chain.provider_names(), vec!["pixabay", "pexels"]);
    }

    #[test]
    fn parses_provider_responses() {
        let pexels = json!({ "photos": [{ "src": { "original": "https://px/1.jpg" } }, { "src": {} }] });
        assert_eq!(pexels_photos(&pexels), vec!["https://px/1.jpg"]);

        let videos = json!({ "videos": [{ "video_files": [{ "link": "https://px/v.mp4" }] }] });
        assert_eq!(pexels_videos(&videos), vec!["https://px/v.mp4"]);

        let unsplash = json!({ "results": [{ "urls": { "raw": "https://un/1" } }] });
        assert_eq!(unsplash_photos(&unsplash), vec!["https://un/1"]);

        let pixabay = json!({ "hits": [{ "webformatURL": "https://pb/1.jpg" }, { "webformatURL": "" }] });
        assert_eq!(pixabay_photos(&pixabay), vec!["https://pb/1.jpg"]);

        assert!(pexels_photos(&json!({})).is_empty());
    }
}
