//! Client configuration (base URL, timeouts)

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const ENV_API_BASE_URL: &str = "BRICK_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "BRICK_API_TIMEOUT_SECS";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Connection settings shared by every request the client issues
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root that endpoint paths are appended to (no trailing slash)
    pub base_url: String,
    /// Whole-request timeout. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            timeout: None,
            user_agent: format!("brick/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Build from `BRICK_API_BASE_URL` / `BRICK_API_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_API_BASE_URL)
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(secs) = std::env::var(ENV_API_TIMEOUT_SECS) {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_API_TIMEOUT_SECS} must be seconds")))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Validate a base URL and strip any trailing slash
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("Invalid base URL {trimmed:?}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Base URL must be http or https, got {}",
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:8000/").unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");

        let config = ClientConfig::new("https://api.example.com/v1//").unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_rejects_invalid_urls() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("ftp://files.example.com"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_with_timeout() {
        let config = ClientConfig::new(DEFAULT_API_BASE_URL)
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
