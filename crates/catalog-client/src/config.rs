use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_BASE_URL: &str = "CINEMA_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "CINEMA_API_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api base url {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("invalid value for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Paths of the remote endpoints this client talks to, relative to the base url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub register: String,
    pub profile: String,
    pub genres: String,
    pub movies: String,
    pub movie_search: String,
    pub movie_filter: String,
    pub actors: String,
    pub reviews: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/users/token".to_string(),
            refresh: "/users/refresh".to_string(),
            register: "/users/register".to_string(),
            profile: "/users/me".to_string(),
            genres: "/genres/".to_string(),
            movies: "/movies".to_string(),
            movie_search: "/movies/search".to_string(),
            movie_filter: "/movies/filter".to_string(),
            actors: "/actors".to_string(),
            reviews: "/reviews".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub page_size: u32,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 40,
            connect_timeout_secs: 10,
            page_size: DEFAULT_PAGE_SIZE,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `CINEMA_API_BASE_URL` and `CINEMA_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_API_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_API_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
        }
        self.base_url()?;
        Ok(self)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                value: self.base_url.clone(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.max(1)
    }

    /// Builds the shared HTTP client used by the executor and the refresh call.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .connect_timeout(self.connect_timeout())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_replace_base_url_and_timeout() {
        let env = HashMap::from([
            (ENV_API_BASE_URL, "https://api.example.test/v1 "),
            (ENV_API_TIMEOUT_SECS, "5"),
        ]);
        let config = ClientConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://api.example.test/v1");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ClientConfig::default()
            .with_overrides(|k| (k == ENV_API_BASE_URL).then(|| "ftp://files".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_garbage_timeout() {
        let err = ClientConfig::default()
            .with_overrides(|k| (k == ENV_API_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }
}
