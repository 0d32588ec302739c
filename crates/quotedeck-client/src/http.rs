use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{Result, StoreError};

/// Base delay for the linear retry backoff: retry n sleeps n times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

// ─── RetryingClient ───────────────────────────────────────────────────────────

/// HTTP client that paces requests and retries transient read failures.
///
/// Only reads are retried. Writes go through [`RetryingClient::send_json`]
/// exactly once, since a replayed create or delete is not safe to repeat
/// blindly.
pub struct RetryingClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RetryingClient {
    pub fn new(min_interval: Duration, max_retries: u32, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        }
    }

    async fn wait_for_pacing(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    /// GET with the transient-failure policy: transport errors and 5xx
    /// responses are retried up to `max_retries` times with linear backoff.
    /// 4xx responses, including 429, are returned to the caller as-is.
    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_pacing().await;
            let resp = self.client.get(url).headers(headers.clone()).send().await;
            match resp {
                Ok(r) if r.status().is_success() => {
                    return r.text().await.map_err(StoreError::Network);
                }
                Ok(r) if r.status().is_server_error() => {
                    let status = r.status().as_u16();
                    if attempt >= self.max_retries {
                        let body = r.text().await.unwrap_or_default();
                        return Err(StoreError::Server {
                            status,
                            message: body,
                        });
                    }
                    attempt += 1;
                    tracing::warn!(
                        "HTTP {status} from {url}, retry {attempt}/{}",
                        self.max_retries
                    );
                    sleep(RETRY_BACKOFF * attempt).await;
                }
                Ok(r) if r.status() == 404 => {
                    return Err(StoreError::NotFound(url.to_string()));
                }
                Ok(r) => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(StoreError::Server {
                        status,
                        message: body,
                    });
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(StoreError::Network(e));
                    }
                    attempt += 1;
                    tracing::warn!("request to {url} failed ({e}), retry {attempt}/{}", self.max_retries);
                    sleep(RETRY_BACKOFF * attempt).await;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        let text = self.get_with_headers(url, headers).await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// Send a mutation exactly once and hand the raw status and body back.
    /// Callers map the status themselves; a 409 on create carries a payload
    /// the caller still wants.
    pub async fn send_json<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&B>,
    ) -> Result<(u16, String)> {
        self.wait_for_pacing().await;
        let mut req = self.client.request(method, url).headers(headers);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(StoreError::Network)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(StoreError::Network)?;
        Ok((status, text))
    }
}

// ─── DiskCache ────────────────────────────────────────────────────────────────

/// Small JSON-on-disk cache keyed by opaque strings, used for tag metadata
/// so repeated invocations do not refetch a list that rarely changes.
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    stored_at: u64, // Unix timestamp secs
    value: T,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl DiskCache {
    pub fn new(namespace: &str, ttl: Duration) -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("quotedeck")
            .join("cache")
            .join(namespace);
        Self::with_dir(dir, ttl)
    }

    /// Cache rooted at an explicit directory instead of the user data dir.
    pub fn with_dir(dir: PathBuf, ttl: Duration) -> Self {
        let _ = std::fs::create_dir_all(&dir);
        Self { dir, ttl }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish();
        self.dir.join(format!("{hash:016x}.json"))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let data = tokio::fs::read(&path).await.ok()?;
        let entry: CacheEntry<T> = serde_json::from_slice(&data).ok()?;
        if unix_now().saturating_sub(entry.stored_at) > self.ttl.as_secs() {
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(entry.value)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let path = self.path_for(key);
        let entry = CacheEntry {
            stored_at: unix_now(),
            value,
        };
        if let Ok(data) = serde_json::to_vec(&entry) {
            let _ = tokio::fs::write(&path, data).await;
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let path = self.path_for(key);
        let _ = tokio::fs::remove_file(&path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(dir: &tempfile::TempDir, ttl: Duration) -> DiskCache {
        DiskCache::with_dir(dir.path().to_path_buf(), ttl)
    }

    #[tokio::test]
    async fn cache_set_get_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = temp_cache(&dir, Duration::from_secs(60));
        cache.set("key1", &"hello world").await;
        let val: Option<String> = cache.get("key1").await;
        assert_eq!(val, Some("hello world".to_string()));
    }

    #[tokio::test]
    async fn cache_expired_entry_is_dropped() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = temp_cache(&dir, Duration::from_secs(60));
        cache.set("key_exp", &42u32).await;

        // Age the stored entry past the TTL instead of waiting it out.
        let entry_path = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .expect("one cache entry on disk")
            .unwrap()
            .path();
        let mut entry: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&entry_path).unwrap()).unwrap();
        entry["stored_at"] = serde_json::json!(unix_now() - 61);
        std::fs::write(&entry_path, serde_json::to_vec(&entry).unwrap()).unwrap();

        let val: Option<u32> = cache.get("key_exp").await;
        assert_eq!(val, None);
        assert!(!entry_path.exists(), "expired entries are removed from disk");
    }

    #[tokio::test]
    async fn cache_invalidate_removes_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = temp_cache(&dir, Duration::from_secs(60));
        cache.set("key_gone", &"stale").await;
        cache.invalidate("key_gone").await;
        let val: Option<String> = cache.get("key_gone").await;
        assert_eq!(val, None);
    }

    #[tokio::test]
    async fn get_retries_server_errors_then_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(500)
            .with_body("boom")
            .expect(2)
            .create_async()
            .await;

        let client = RetryingClient::new(Duration::from_secs(0), 1, "quotedeck-test");
        let err = client
            .get(&format!("{}/flaky", server.url()))
            .await
            .unwrap_err();
        mock.assert_async().await;
        match err {
            StoreError::Server { status, .. } => assert_eq!(status, 500),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;

        let client = RetryingClient::new(Duration::from_secs(0), 3, "quotedeck-test");
        let err = client
            .get(&format!("{}/limited", server.url()))
            .await
            .unwrap_err();
        mock.assert_async().await;
        match err {
            StoreError::Server { status, .. } => assert_eq!(status, 429),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = RetryingClient::new(Duration::from_secs(0), 3, "quotedeck-test");
        let err = client
            .get(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn send_json_does_not_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/once")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let client = RetryingClient::new(Duration::from_secs(0), 3, "quotedeck-test");
        let (status, body) = client
            .send_json(
                Method::POST,
                &format!("{}/once", server.url()),
                HeaderMap::new(),
                Some(&serde_json::json!({"k": "v"})),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(status, 500);
        assert_eq!(body, "boom");
    }
}
