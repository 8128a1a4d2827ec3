mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use catalog_client::{ErrorKind, JsonFileStore, KeyValueStore, RefreshError};
use common::{unauthorized, Reply, TestServer};
use serde_json::json;

fn profile_body() -> serde_json::Value {
    json!({"email": "neo@zion.io", "nickname": "neo", "role": "user"})
}

/// Refresh hands out `a-2`/`r-2`; `/users/me` only accepts `a-2`.
async fn rotating_server(refresh_delay: Duration) -> Result<TestServer> {
    TestServer::start(move |req| match req.path.as_str() {
        "/users/refresh" => Reply::json(
            200,
            json!({"access_token": "a-2", "refresh_token": "r-2", "token_type": "bearer"}),
        )
        .after(refresh_delay),
        "/users/me" if req.bearer() == Some("a-2") => Reply::json(200, profile_body()),
        "/users/me" => unauthorized(),
        "/genres/" if req.bearer() == Some("a-2") => {
            Reply::json(200, json!([{"id": 1, "name": "Drama", "tmdb_id": 18}]))
        }
        "/genres/" => unauthorized(),
        _ => Reply::json(404, json!({"detail": "Not Found"})),
    })
    .await
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_the_call_retried() -> Result<()> {
    let server = rotating_server(Duration::ZERO).await?;
    let (api, store) = server.client(Some("a-1"), Some("r-1"))?;

    let profile = api.profile().await?;
    assert_eq!(profile.nickname, "neo");

    let refreshes = server.hits("POST", "/users/refresh");
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].bearer(), Some("r-1"));

    let calls = server.hits("GET", "/users/me");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].bearer(), Some("a-1"));
    assert_eq!(calls[1].bearer(), Some("a-2"));

    assert_eq!(api.session().access_token().as_deref(), Some("a-2"));
    assert_eq!(store.get("access_token")?.as_deref(), Some("a-2"));
    assert_eq!(store.get("refresh_token")?.as_deref(), Some("r-2"));
    Ok(())
}

#[tokio::test]
async fn concurrent_refresh_callers_share_one_network_call() -> Result<()> {
    let server = rotating_server(Duration::from_millis(150)).await?;
    let (api, _store) = server.client(Some("a-1"), Some("r-1"))?;
    let session = api.session().clone();

    let outcomes = futures::future::join_all((0..5).map(|_| {
        let session = session.clone();
        async move { session.refresh().await }
    }))
    .await;

    assert_eq!(server.hits("POST", "/users/refresh").len(), 1);
    for outcome in outcomes {
        assert_eq!(outcome, Ok("a-2".to_string()));
    }

    // Settled: the next refresh is a new network call.
    session.refresh().await?;
    assert_eq!(server.hits("POST", "/users/refresh").len(), 2);
    Ok(())
}

#[tokio::test]
async fn simultaneous_401s_trigger_a_single_refresh() -> Result<()> {
    let server = rotating_server(Duration::from_millis(100)).await?;
    let (api, _store) = server.client(Some("a-1"), Some("r-1"))?;

    let results = futures::future::join_all((0..4).map(|_| api.genres())).await;
    for result in results {
        assert_eq!(result?.len(), 1);
    }
    assert_eq!(server.hits("POST", "/users/refresh").len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_clears_both_tokens() -> Result<()> {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/users/refresh" => Reply::json(401, json!({"detail": "Token expired or invalid"})),
        _ => unauthorized(),
    })
    .await?;
    let (api, store) = server.client(Some("a-1"), Some("r-1"))?;

    let err = api.profile().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(api.session().access_token(), None);
    assert!(!api.is_authenticated());
    assert_eq!(store.get("access_token")?, None);
    assert_eq!(store.get("refresh_token")?, None);

    // Only the original call went out; no retry without a fresh token.
    assert_eq!(server.hits("GET", "/users/me").len(), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_failure_is_reported_to_direct_callers() -> Result<()> {
    let server = TestServer::start(|_| Reply::text(500, "<html>boom</html>")).await?;
    let (api, store) = server.client(Some("a-1"), Some("r-1"))?;

    let outcome = api.session().refresh().await;
    assert!(matches!(outcome, Err(RefreshError::RefreshFailed(_))));
    assert_eq!(api.session().access_token(), None);
    assert_eq!(store.get("refresh_token")?, None);
    Ok(())
}

#[tokio::test]
async fn malformed_refresh_body_clears_session() -> Result<()> {
    let server = TestServer::start(|_| Reply::text(200, "not json")).await?;
    let (api, _store) = server.client(Some("a-1"), Some("r-1"))?;

    assert!(matches!(
        api.session().refresh().await,
        Err(RefreshError::RefreshFailed(_))
    ));
    assert!(!api.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn persistent_401_after_retry_is_an_auth_error() -> Result<()> {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/users/refresh" => Reply::json(200, json!({"access_token": "a-2"})),
        _ => unauthorized(),
    })
    .await?;
    let (api, _store) = server.client(Some("a-1"), Some("r-1"))?;

    let err = api.profile().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(server.hits("GET", "/users/me").len(), 2);
    assert_eq!(server.hits("POST", "/users/refresh").len(), 1);
    assert!(!api.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_on_401_is_an_auth_error() -> Result<()> {
    let server = TestServer::start(|_| unauthorized()).await?;
    let (api, _store) = server.client(Some("a-1"), None)?;

    let err = api.profile().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(server.hits("POST", "/users/refresh").is_empty());
    assert!(!api.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn anonymous_401_is_an_auth_error() -> Result<()> {
    let server = TestServer::start(|_| unauthorized()).await?;
    let (api, _store) = server.client(None, None)?;

    let err = api.profile().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.status(), Some(401));
    Ok(())
}

#[tokio::test]
async fn direct_refresh_without_refresh_token_reports_no_credentials() -> Result<()> {
    let server = TestServer::start(|_| unauthorized()).await?;
    let (api, _store) = server.client(Some("a-1"), None)?;

    let outcome = api.session().refresh().await;
    assert_eq!(outcome, Err(RefreshError::NoCredentials));
    assert!(server.hits("POST", "/users/refresh").is_empty());
    Ok(())
}

#[tokio::test]
async fn refreshed_tokens_survive_a_restart_on_disk() -> Result<()> {
    let server = rotating_server(Duration::ZERO).await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");

    {
        let store = Arc::new(JsonFileStore::open(&path)?);
        store.set("access_token", "a-1")?;
        store.set("refresh_token", "r-1")?;
        let api = catalog_client::CatalogApi::connect(&server.config(), store)?;
        api.profile().await?;
    }

    let reopened = JsonFileStore::open(&path)?;
    assert_eq!(reopened.get("access_token")?.as_deref(), Some("a-2"));
    assert_eq!(reopened.get("refresh_token")?.as_deref(), Some("r-2"));
    Ok(())
}
