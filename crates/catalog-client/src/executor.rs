use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::redact::redact_secrets;
use crate::request::{Method, RequestDescriptor};
use crate::session::SessionManager;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Query parameter carrying the per-request nonce on every GET.
pub const CACHE_BUST_PARAM: &str = "_t";

/// Issues every API call: credentials, cache busting, failure classification
/// and one transparent refresh-and-retry on 401.
pub struct RequestExecutor {
    http: reqwest::Client,
    base_url: Url,
    session: SessionManager,
    /// Endpoints whose 401 means "bad credentials", not "expired token".
    auth_exempt: Vec<String>,
    nonce_seq: AtomicU64,
}

fn network_error(err: reqwest::Error) -> ApiError {
    ApiError::Network(redact_secrets(&err.to_string()).into_owned())
}

fn normalize_path(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Message for a non-2xx response: the `detail` field when the body is JSON,
/// the whole JSON body otherwise, and the status text when it is not JSON.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.contains_key("detail") => match &map["detail"] {
            Value::String(detail) => detail.clone(),
            other => other.to_string(),
        },
        Ok(Value::Null) | Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        Ok(other) => other.to_string(),
    }
}

impl RequestExecutor {
    pub fn new(config: &ClientConfig, session: SessionManager) -> Result<Self, ApiError> {
        let http = config.http_client().map_err(network_error)?;
        Self::with_client(http, config, session)
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &ClientConfig,
        session: SessionManager,
    ) -> Result<Self, ApiError> {
        let base_url = config
            .base_url()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let auth_exempt = [&config.endpoints.login, &config.endpoints.refresh]
            .into_iter()
            .map(|p| normalize_path(p))
            .collect();
        Ok(Self {
            http,
            base_url,
            session,
            auth_exempt,
            nonce_seq: AtomicU64::new(0),
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Unique per call: wall-clock millis plus a process-wide sequence, so two
    /// GETs issued within the same millisecond still differ.
    fn next_nonce(&self) -> String {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let seq = self.nonce_seq.fetch_add(1, Ordering::Relaxed);
        format!("{millis}{seq:06}")
    }

    pub fn build_url(&self, descriptor: &RequestDescriptor) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let endpoint = descriptor.endpoint();
        let joined = if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        };
        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::Validation(format!("invalid endpoint {endpoint:?}: {e}")))?;

        let is_get = descriptor.method() == Method::Get;
        if is_get || !descriptor.query().is_empty() {
            let mut pairs = url.query_pairs_mut();
            if is_get {
                pairs.append_pair(CACHE_BUST_PARAM, &self.next_nonce());
            }
            for (key, value) in descriptor.query() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn is_auth_exempt(&self, endpoint: &str) -> bool {
        let path = normalize_path(endpoint);
        self.auth_exempt.iter().any(|p| *p == path)
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.build_url(descriptor)?;
        let mut req = self
            .http
            .request(descriptor.method().to_http(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::Validation("access token is not a valid header value".to_string()))?;
            req = req.header(AUTHORIZATION, value);
        }

        if let Some(body) = descriptor.body() {
            if let Some(content_type) = body.content_type() {
                req = req.header(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            req = req.body(body.to_bytes());
        }

        let res = req.send().await.map_err(network_error)?;
        debug!(
            method = descriptor.method().as_str(),
            endpoint = descriptor.endpoint(),
            status = res.status().as_u16(),
            "api call"
        );
        Ok(res)
    }

    async fn read_outcome(&self, res: reqwest::Response) -> Result<Value, ApiError> {
        let status = res.status();
        let text = res.text().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Protocol(format!("response body is not valid json: {e}")))
    }

    fn teardown(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "failed to remove persisted tokens");
        }
    }

    /// Executes `descriptor` and yields the parsed JSON body or a classified failure.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Value, ApiError> {
        let sent_with = self.session.access_token();
        let res = self.send(descriptor, sent_with.as_deref()).await?;

        if res.status() != StatusCode::UNAUTHORIZED || self.is_auth_exempt(descriptor.endpoint()) {
            return self.read_outcome(res).await;
        }

        debug!(endpoint = descriptor.endpoint(), "401 received; refreshing session");
        // Another request may already have rotated the token while this one was in flight.
        let fresh = match self.session.access_token() {
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => current,
            _ => match self.session.refresh().await {
                Ok(token) => token,
                Err(e) => {
                    self.teardown();
                    return Err(ApiError::Auth(e.to_string()));
                }
            },
        };

        let retried = self.send(descriptor, Some(&fresh)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            self.teardown();
            let message = retried
                .text()
                .await
                .map(|body| error_message(StatusCode::UNAUTHORIZED, &body))
                .unwrap_or_else(|_| "unauthorized".to_string());
            return Err(ApiError::Auth(message));
        }
        self.read_outcome(retried).await
    }

    /// [`execute`](Self::execute) followed by typed deserialization. A body that
    /// is valid JSON but does not fit `T` is a protocol error.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let value = self.execute(descriptor).await?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::Protocol(format!(
                "unexpected response shape from {}: {e}",
                descriptor.endpoint()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn executor(base: &str) -> RequestExecutor {
        let config = ClientConfig {
            base_url: base.to_string(),
            ..ClientConfig::default()
        };
        let session = SessionManager::load(
            Arc::new(MemoryStore::new()),
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/users/refresh").unwrap(),
        )
        .unwrap();
        RequestExecutor::new(&config, session).unwrap()
    }

    fn nonce_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == CACHE_BUST_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn get_urls_carry_distinct_cache_busters() {
        let exec = executor("http://127.0.0.1:8000");
        let descriptor = RequestDescriptor::get("/movies/search").param("search", "alien");

        let first = exec.build_url(&descriptor).unwrap();
        let second = exec.build_url(&descriptor).unwrap();
        assert_ne!(nonce_of(&first), nonce_of(&second));
        assert_eq!(first.path(), "/movies/search");
        assert!(first.query_pairs().any(|(k, v)| k == "search" && v == "alien"));
    }

    #[test]
    fn non_get_urls_have_no_cache_buster() {
        let exec = executor("http://127.0.0.1:8000");
        let url = exec.build_url(&RequestDescriptor::post("/movies/3/progress")).unwrap();
        assert_eq!(url.query(), None);

        let url = exec
            .build_url(&RequestDescriptor::delete("/reviews/3/reviews").param("review_id", 9))
            .unwrap();
        assert_eq!(url.query(), Some("review_id=9"));
    }

    #[test]
    fn base_url_path_prefix_is_preserved() {
        let exec = executor("https://api.example.test/v1/");
        let url = exec.build_url(&RequestDescriptor::post("/users/token")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/v1/users/token");
    }

    #[test]
    fn login_and_refresh_are_exempt_from_retry() {
        let exec = executor("http://127.0.0.1:8000");
        assert!(exec.is_auth_exempt("/users/token"));
        assert!(exec.is_auth_exempt("/users/refresh/"));
        assert!(!exec.is_auth_exempt("/users/me"));
    }

    #[test]
    fn error_message_prefers_detail_then_body_then_status_text() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"detail":"Отзыв не найден в базе"}"#),
            "Отзыв не найден в базе"
        );
        assert_eq!(
            error_message(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"detail":[{"loc":["query","page"],"msg":"bad"}]}"#
            ),
            r#"[{"loc":["query","page"],"msg":"bad"}]"#
        );
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"error":"exists"}"#),
            r#"{"error":"exists"}"#
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream</html>"),
            "Bad Gateway"
        );
    }
}
