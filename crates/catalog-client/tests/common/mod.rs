#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use catalog_client::{CatalogApi, ClientConfig, MemoryStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// One request as the test server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Lower-cased names.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn start(handler: impl Fn(&Recorded) -> Reply + Send + Sync + 'static) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => { break; }
                    res = listener.accept() => {
                        let Ok((sock, _peer)) = res else { break; };
                        let handler = Arc::clone(&handler);
                        let log = Arc::clone(&log);
                        tokio::spawn(async move {
                            let _ = serve_one_connection(sock, handler, log).await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            addr,
            requests,
            _shutdown: shutdown_tx,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn hits(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            request_timeout_secs: 5,
            ..ClientConfig::default()
        }
    }

    /// A client whose store already holds `access`/`refresh`.
    pub fn client(&self, access: Option<&str>, refresh: Option<&str>) -> Result<(CatalogApi, Arc<MemoryStore>)> {
        use catalog_client::KeyValueStore;
        let store = Arc::new(MemoryStore::new());
        if let Some(access) = access {
            store.set("access_token", access)?;
        }
        if let Some(refresh) = refresh {
            store.set("refresh_token", refresh)?;
        }
        let api = CatalogApi::connect(&self.config(), store.clone())?;
        Ok((api, store))
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

async fn serve_one_connection(
    mut sock: TcpStream,
    handler: Handler,
    log: Arc<Mutex<Vec<Recorded>>>,
) -> Result<()> {
    let mut buf = Vec::with_capacity(8 * 1024);
    let mut chunk = [0u8; 4096];
    let head_len = loop {
        let read = sock.read(&mut chunk).await?;
        if read == 0 {
            anyhow::bail!("client disconnected before request complete");
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
        anyhow::ensure!(buf.len() < 64 * 1024, "request headers too large");
    };

    let head = std::str::from_utf8(&buf[..head_len])?.to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing request line"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing method"))?
        .to_string();
    let target = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing target"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < head_len + content_length {
        let read = sock.read(&mut chunk).await?;
        if read == 0 {
            anyhow::bail!("client disconnected before body complete");
        }
        buf.extend_from_slice(&chunk[..read]);
    }
    let body = String::from_utf8_lossy(&buf[head_len..head_len + content_length]).into_owned();

    let url = reqwest::Url::parse(&format!("http://test{target}"))?;
    let recorded = Recorded {
        method,
        path: url.path().to_string(),
        query: url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        headers,
        body,
    };
    if let Ok(mut log) = log.lock() {
        log.push(recorded.clone());
    }

    let reply = handler(&recorded);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let reason = reqwest::StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let response = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.body.len(),
        reply.body
    );
    sock.write_all(response.as_bytes()).await?;
    sock.shutdown().await?;
    Ok(())
}

pub fn unauthorized() -> Reply {
    Reply::json(401, serde_json::json!({"detail": "Could not validate credentials"}))
}

pub fn movie_page(total_items: u64, ids: impl IntoIterator<Item = i64>) -> serde_json::Value {
    let items: Vec<_> = ids
        .into_iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "title": format!("Movie {id}"),
                "media_type": "movie",
                "release_year": 2000,
                "rating": 7.5
            })
        })
        .collect();
    serde_json::json!({"items": items, "total_items": total_items})
}
