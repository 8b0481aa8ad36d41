//! Collaborator error types

use std::time::Duration;
use thiserror::Error;

/// Failure of an external collaborator call, with classification
#[derive(Debug, Clone, Error)]
#[error("{service}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub service: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, service: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            service,
            message: message.into(),
        }
    }

    pub fn timeout(service: &'static str, after: Duration) -> Self {
        Self::new(
            ServiceErrorKind::Timeout,
            service,
            format!("timed out after {}s", after.as_secs()),
        )
    }

    pub fn network(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, service, message)
    }

    pub fn not_configured(service: &'static str) -> Self {
        Self::new(ServiceErrorKind::Auth, service, "no API key configured")
    }

    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidResponse, service, message)
    }

    pub fn unknown(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, service, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ServiceErrorKind::Auth,
            429 => ServiceErrorKind::RateLimit,
            500..=599 => ServiceErrorKind::Server,
            _ => ServiceErrorKind::Unknown,
        };
        Self::new(kind, service, format!("HTTP {status}: {}", truncate(body, 300)))
    }

    /// Classify a transport-level reqwest failure
    pub fn from_reqwest(service: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ServiceErrorKind::Timeout, service, format!("request timeout: {err}"))
        } else if err.is_connect() {
            Self::network(service, format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::invalid_response(service, format!("failed to decode response: {err}"))
        } else {
            Self::unknown(service, format!("request failed: {err}"))
        }
    }
}

/// Error classification, mostly for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Our own deadline or the client's request timeout
    Timeout,
    Network,
    RateLimit,
    /// Authentication failed or no credentials configured
    Auth,
    /// 5xx from the provider
    Server,
    /// Response arrived but could not be understood
    InvalidResponse,
    Unknown,
}

impl ServiceErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::RateLimit | Self::Server)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            ServiceError::from_status("openai", 401, "").kind,
            ServiceErrorKind::Auth
        );
        assert_eq!(
            ServiceError::from_status("openai", 429, "").kind,
            ServiceErrorKind::RateLimit
        );
        assert_eq!(
            ServiceError::from_status("openai", 503, "").kind,
            ServiceErrorKind::Server
        );
        assert_eq!(
            ServiceError::from_status("openai", 418, "").kind,
            ServiceErrorKind::Unknown
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = ServiceError::from_status("switchboard", 500, &body);
        assert!(err.message.len() < 400);
        assert!(err.message.ends_with("..."));
    }

    #[test]
    fn display_names_the_service() {
        let err = ServiceError::timeout("pexels", Duration::from_secs(30));
        assert_eq!(err.to_string(), "pexels: timed out after 30s");
        assert!(err.kind.is_transient());
    }
}
