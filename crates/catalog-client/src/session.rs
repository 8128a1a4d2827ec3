use crate::error::{RefreshError, StorageError};
use crate::models::TokenPair;
use crate::redact::redact_secrets;
use crate::storage::{lock, KeyValueStore};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// The access/refresh token pair. At most one per client instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

type RefreshFlight = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

struct Inner {
    store: Arc<dyn KeyValueStore>,
    http: reqwest::Client,
    refresh_url: Url,
    session: Mutex<Session>,
    inflight: Mutex<Option<(u64, RefreshFlight)>>,
    next_flight: AtomicU64,
    authenticated: watch::Sender<bool>,
}

/// Owns the token pair, its persistence and the refresh protocol.
///
/// Cloning is cheap and every clone shares the same session, so the executor
/// and the login/logout flows always observe one consistent token pair.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Loads any persisted tokens from `store`.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        http: reqwest::Client,
        refresh_url: Url,
    ) -> Result<Self, StorageError> {
        let session = Session {
            access_token: normalize(store.get(KEY_ACCESS_TOKEN)?),
            refresh_token: normalize(store.get(KEY_REFRESH_TOKEN)?),
        };
        let (authenticated, _) = watch::channel(session.is_authenticated());
        debug!(
            authenticated = session.is_authenticated(),
            "session loaded from storage"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                http,
                refresh_url,
                session: Mutex::new(session),
                inflight: Mutex::new(None),
                next_flight: AtomicU64::new(1),
                authenticated,
            }),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        lock(&self.inner.session).access_token.clone()
    }

    pub fn snapshot(&self) -> Session {
        lock(&self.inner.session).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.inner.session).is_authenticated()
    }

    /// Replaces the access token, and the refresh token when one is given.
    /// `None` for `refresh` keeps the stored refresh token.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        self.inner.set_tokens(access, refresh)
    }

    /// Drops both tokens. Idempotent.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear()
    }

    /// Watch channel that flips whenever the session gains or loses an access token.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.authenticated.subscribe()
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Single-flight: while one refresh is pending every other caller awaits
    /// that same call and observes its settled outcome. On any failure the
    /// session is torn down before the error is returned.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let flight = {
            let mut slot = lock(&self.inner.inflight);
            match slot.as_ref() {
                Some((id, flight)) => {
                    debug!(flight = id, "joining in-flight token refresh");
                    flight.clone()
                }
                None => {
                    let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        let outcome = inner.run_refresh().await;
                        inner.settle(id);
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }
}

impl Inner {
    fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        let access = access.trim().to_string();
        let refresh = normalize(refresh.map(str::to_string));
        {
            let mut session = lock(&self.session);
            session.access_token = Some(access.clone()).filter(|t| !t.is_empty());
            if refresh.is_some() {
                session.refresh_token = refresh.clone();
            }
        }
        self.authenticated.send_replace(!access.is_empty());

        if access.is_empty() {
            self.store.remove(KEY_ACCESS_TOKEN)?;
        } else {
            self.store.set(KEY_ACCESS_TOKEN, &access)?;
        }
        if let Some(refresh) = refresh {
            self.store.set(KEY_REFRESH_TOKEN, &refresh)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *lock(&self.session) = Session::default();
        self.authenticated.send_replace(false);

        let access = self.store.remove(KEY_ACCESS_TOKEN);
        let refresh = self.store.remove(KEY_REFRESH_TOKEN);
        access.and(refresh)
    }

    fn settle(&self, id: u64) {
        let mut slot = lock(&self.inflight);
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
    }

    async fn run_refresh(&self) -> Result<String, RefreshError> {
        let Some(refresh_token) = lock(&self.session).refresh_token.clone() else {
            return Err(RefreshError::NoCredentials);
        };

        match self.request_tokens(&refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.set_tokens(&pair.access_token, pair.refresh_token.as_deref()) {
                    // The new pair is live in memory; only durability is lost.
                    warn!(error = %e, "failed to persist refreshed tokens");
                }
                info!("access token refreshed");
                Ok(pair.access_token)
            }
            Err(reason) => {
                warn!(%reason, "token refresh failed; clearing session");
                if let Err(e) = self.clear() {
                    warn!(error = %e, "failed to remove persisted tokens");
                }
                Err(RefreshError::RefreshFailed(reason))
            }
        }
    }

    async fn request_tokens(&self, refresh_token: &str) -> Result<TokenPair, String> {
        let bearer = HeaderValue::from_str(&format!("Bearer {refresh_token}"))
            .map_err(|_| "stored refresh token is not a valid header value".to_string())?;

        let res = self
            .http
            .post(self.refresh_url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, bearer)
            .send()
            .await
            .map_err(|e| redact_secrets(&e.to_string()).into_owned())?;

        let status = res.status();
        if !status.is_success() {
            return Err(format!("refresh endpoint returned {}", status.as_u16()));
        }

        let text = res
            .text()
            .await
            .map_err(|e| redact_secrets(&e.to_string()).into_owned())?;
        let pair: TokenPair = serde_json::from_str(&text)
            .map_err(|e| format!("malformed refresh response: {e}"))?;
        if pair.access_token.trim().is_empty() {
            return Err("refresh response carried an empty access token".to_string());
        }
        Ok(pair)
    }
}
