//! Publishing adapter
//!
//! Platform authorization is handled outside this service, so posts are
//! recorded in the log with a receipt id. Real platform clients implement
//! [`Publisher`] in place of this one.

use super::{PostDraft, Publisher, ServiceError};
use async_trait::async_trait;

pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, platform: &str, post: &PostDraft) -> Result<String, ServiceError> {
        if post.caption.trim().is_empty() && post.media_url.is_none() {
            return Err(ServiceError::invalid_response(
                "publisher",
                format!("nothing to publish on {platform}"),
            ));
        }
        let receipt = format!("{platform}-{}", uuid::Uuid::new_v4().simple());
        tracing::info!(
            platform,
            receipt = %receipt,
            media = ?post.media_url,
            schedule = ?post.schedule,
            caption_chars = post.caption.chars().count(),
            "Post recorded for publishing"
        );
        Ok(receipt)
    }
}
