use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use quotedeck_core::{Quote, QuoteDraft, SortSpec, TagInfo};

use crate::error::{Result, StoreError};
use crate::http::{DiskCache, RetryingClient};

/// Pacing between requests from one store instance.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);
const MAX_RETRIES: u32 = 3;
/// Tag metadata changes rarely; ten minutes of staleness is acceptable.
const TAG_CACHE_TTL: Duration = Duration::from_secs(600);

const USER_AGENT: &str = concat!("quotedeck/", env!("CARGO_PKG_VERSION"));

// ─── Request/response shapes ──────────────────────────────────────────────────

/// Credentials for the two halves of the service: the admin API wants a
/// bearer token, the public quote endpoints want an API key.
#[derive(Debug, Clone, Default)]
pub struct StoreAuth {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
}

impl StoreAuth {
    /// Read credentials from the named environment variables; unset or empty
    /// variables leave the corresponding credential absent.
    pub fn from_env(token_var: &str, api_key_var: &str) -> Self {
        let read = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());
        Self {
            bearer_token: read(token_var),
            api_key: read(api_key_var),
        }
    }
}

/// Window onto a listing: page size, sort order, and the resume cursor from
/// the previous page.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub limit: usize,
    pub sort: SortSpec,
    pub cursor: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: 50,
            sort: SortSpec::default(),
            cursor: None,
        }
    }
}

impl ListParams {
    pub fn new(limit: usize, sort: SortSpec) -> Self {
        Self {
            limit,
            sort,
            cursor: None,
        }
    }

    fn apply(&self, url: &mut reqwest::Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("limit", &self.limit.to_string());
        pairs.append_pair("sort_by", self.sort.field.as_param());
        pairs.append_pair("sort_order", self.sort.order_param());
        if let Some(key) = &self.cursor {
            pairs.append_pair("last_key", key);
        }
    }
}

/// One page of quotes plus the bookkeeping needed to fetch the next.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotePage {
    #[serde(default)]
    pub quotes: Vec<Quote>,
    /// Search responses call this field `total`; listings call it
    /// `total_count`.
    #[serde(default, alias = "total")]
    pub total_count: Option<usize>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_key: Option<String>,
}

/// A stored quote the service judged similar to a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub id: String,
    #[serde(rename = "quote")]
    pub text: String,
    pub author: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub match_reason: Option<String>,
}

/// Duplicate verdict for a candidate quote, as returned both by the explicit
/// check endpoint and by a rejected create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub duplicate_count: usize,
    #[serde(default)]
    pub duplicates: Vec<DuplicateMatch>,
    #[serde(default)]
    pub message: String,
}

/// Result of purging tags no quote references anymore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    #[serde(default)]
    pub removed_tags: Vec<String>,
    #[serde(default)]
    pub remaining_tags: Vec<String>,
    #[serde(default)]
    pub count_removed: usize,
    #[serde(default)]
    pub count_remaining: usize,
}

#[derive(Deserialize)]
struct QuoteEnvelope {
    quote: Quote,
}

#[derive(Deserialize)]
struct TagListEnvelope {
    #[serde(default)]
    tags: Vec<TagInfo>,
}

#[derive(Deserialize)]
struct TagAddEnvelope {
    #[serde(default)]
    all_tags: Vec<String>,
}

#[derive(Deserialize)]
struct TagMutationEnvelope {
    #[serde(default)]
    quotes_updated: usize,
}

#[derive(Deserialize)]
struct DeleteEnvelope {
    deleted_quote_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Vec<String>>,
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| StoreError::Parse(e.to_string()))
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Map a failed mutation response onto the error taxonomy, preferring the
/// service's own wording where the body carries any.
fn mutation_error(status: u16, body: &str, context: &str) -> StoreError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    match status {
        404 => StoreError::NotFound(context.to_string()),
        400 => {
            let detail = match parsed {
                Some(ErrorBody {
                    details: Some(d), ..
                }) if !d.is_empty() => d.join("; "),
                Some(ErrorBody { error, .. }) if !error.is_empty() => error,
                _ => body.to_string(),
            };
            StoreError::Validation(detail)
        }
        _ => {
            let message = match parsed {
                Some(ErrorBody { error, .. }) if !error.is_empty() => error,
                Some(ErrorBody {
                    message: Some(m), ..
                }) => m,
                _ => body.to_string(),
            };
            StoreError::Server { status, message }
        }
    }
}

// ─── QuoteStore ───────────────────────────────────────────────────────────────

/// Client for the remote quote service: the authenticated admin API plus the
/// public keyed quote endpoints.
pub struct QuoteStore {
    client: RetryingClient,
    cache: DiskCache,
    base_url: String,
    auth: StoreAuth,
}

impl QuoteStore {
    pub fn new(base_url: &str, auth: StoreAuth) -> Self {
        Self::with_config(base_url, DEFAULT_MIN_INTERVAL, auth)
    }

    pub fn with_config(base_url: &str, min_interval: Duration, auth: StoreAuth) -> Self {
        Self {
            client: RetryingClient::new(min_interval, MAX_RETRIES, USER_AGENT),
            cache: DiskCache::new("tags", TAG_CACHE_TTL),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| StoreError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Parse(format!("cannot build paths on {}", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    fn admin_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match &self.auth.bearer_token {
            Some(token) => {
                if let Ok(value) = format!("Bearer {token}").parse() {
                    headers.insert(AUTHORIZATION, value);
                }
            }
            None => tracing::warn!("no admin token configured, request will likely be rejected"),
        }
        headers
    }

    fn public_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.auth.api_key {
            if let Ok(value) = key.parse() {
                headers.insert("x-api-key", value);
            }
        }
        headers
    }

    fn tags_cache_key(&self) -> String {
        format!("metadata:{}", self.base_url)
    }

    async fn drop_cached_tags(&self) {
        self.cache.invalidate(&self.tags_cache_key()).await;
    }

    // ─── Listing and search ───────────────────────────────────────────────

    pub async fn list_quotes(&self, params: &ListParams) -> Result<QuotePage> {
        let mut url = self.endpoint(&["admin", "quotes"])?;
        params.apply(&mut url);
        tracing::debug!("listing quotes: {url}");
        self.client.get_json(url.as_str(), self.admin_headers()).await
    }

    pub async fn search_quotes(&self, query: &str, params: &ListParams) -> Result<QuotePage> {
        let mut url = self.endpoint(&["admin", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        params.apply(&mut url);
        tracing::debug!("searching quotes: {url}");
        self.client.get_json(url.as_str(), self.admin_headers()).await
    }

    // ─── Quote mutations ──────────────────────────────────────────────────

    /// Create a quote. A 409 from the service becomes
    /// [`StoreError::DuplicateDetected`] with the full report attached, so
    /// callers can show the operator what it collided with.
    pub async fn create_quote(&self, draft: &QuoteDraft) -> Result<Quote> {
        let violations = draft.violations();
        if !violations.is_empty() {
            return Err(StoreError::Validation(violations.join("; ")));
        }
        let url = self.endpoint(&["admin", "quotes"])?;
        let (status, body) = self
            .client
            .send_json(Method::POST, url.as_str(), self.admin_headers(), Some(draft))
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: QuoteEnvelope = parse_json(&body)?;
            return Ok(envelope.quote);
        }
        if status == 409 {
            let report: DuplicateReport = parse_json(&body)?;
            return Err(StoreError::DuplicateDetected(report));
        }
        Err(mutation_error(status, &body, "create quote"))
    }

    pub async fn update_quote(&self, id: &str, draft: &QuoteDraft) -> Result<Quote> {
        let violations = draft.violations();
        if !violations.is_empty() {
            return Err(StoreError::Validation(violations.join("; ")));
        }
        let url = self.endpoint(&["admin", "quotes", id])?;
        let (status, body) = self
            .client
            .send_json(Method::PUT, url.as_str(), self.admin_headers(), Some(draft))
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: QuoteEnvelope = parse_json(&body)?;
            return Ok(envelope.quote);
        }
        Err(mutation_error(status, &body, &format!("quote {id}")))
    }

    /// Delete a quote, returning the id the service confirmed it removed.
    pub async fn delete_quote(&self, id: &str) -> Result<String> {
        let url = self.endpoint(&["admin", "quotes", id])?;
        let (status, body) = self
            .client
            .send_json::<()>(Method::DELETE, url.as_str(), self.admin_headers(), None)
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: DeleteEnvelope = parse_json(&body)?;
            return Ok(envelope.deleted_quote_id);
        }
        Err(mutation_error(status, &body, &format!("quote {id}")))
    }

    /// Ask the service whether a candidate quote would be a duplicate,
    /// without creating anything.
    pub async fn check_duplicate(&self, text: &str, author: &str) -> Result<DuplicateReport> {
        let url = self.endpoint(&["admin", "check-duplicate"])?;
        let payload = serde_json::json!({ "quote": text, "author": author });
        let (status, body) = self
            .client
            .send_json(Method::POST, url.as_str(), self.admin_headers(), Some(&payload))
            .await?;
        if is_success(status) {
            return parse_json(&body);
        }
        Err(mutation_error(status, &body, "duplicate check"))
    }

    // ─── Tags ─────────────────────────────────────────────────────────────

    pub async fn get_tags_with_metadata(&self) -> Result<Vec<TagInfo>> {
        let key = self.tags_cache_key();
        if let Some(cached) = self.cache.get::<Vec<TagInfo>>(&key).await {
            tracing::debug!("tag metadata served from cache");
            return Ok(cached);
        }
        let url = self.endpoint(&["admin", "tags"])?;
        let envelope: TagListEnvelope =
            self.client.get_json(url.as_str(), self.admin_headers()).await?;
        self.cache.set(&key, &envelope.tags).await;
        Ok(envelope.tags)
    }

    pub async fn get_tags(&self) -> Result<Vec<String>> {
        let tags = self.get_tags_with_metadata().await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    /// Register a tag so it can be offered for assignment. Returns the full
    /// tag list as the service sees it afterwards.
    pub async fn add_tag(&self, name: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["admin", "tags"])?;
        let payload = serde_json::json!({ "tag": name });
        let (status, body) = self
            .client
            .send_json(Method::POST, url.as_str(), self.admin_headers(), Some(&payload))
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: TagAddEnvelope = parse_json(&body)?;
            return Ok(envelope.all_tags);
        }
        Err(mutation_error(status, &body, &format!("tag {name}")))
    }

    /// Rename a tag across every quote carrying it. Returns how many quotes
    /// were rewritten.
    pub async fn rename_tag(&self, old: &str, new: &str) -> Result<usize> {
        let url = self.endpoint(&["admin", "tags", old])?;
        let payload = serde_json::json!({ "tag": new });
        let (status, body) = self
            .client
            .send_json(Method::PUT, url.as_str(), self.admin_headers(), Some(&payload))
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: TagMutationEnvelope = parse_json(&body)?;
            return Ok(envelope.quotes_updated);
        }
        Err(mutation_error(status, &body, &format!("tag {old}")))
    }

    /// Remove a tag from the registry and from every quote carrying it.
    /// Returns how many quotes were rewritten.
    pub async fn delete_tag(&self, name: &str) -> Result<usize> {
        let url = self.endpoint(&["admin", "tags", name])?;
        let (status, body) = self
            .client
            .send_json::<()>(Method::DELETE, url.as_str(), self.admin_headers(), None)
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            let envelope: TagMutationEnvelope = parse_json(&body)?;
            return Ok(envelope.quotes_updated);
        }
        Err(mutation_error(status, &body, &format!("tag {name}")))
    }

    /// Purge registered tags that no quote references anymore.
    pub async fn cleanup_unused_tags(&self) -> Result<CleanupReport> {
        let url = self.endpoint(&["admin", "tags", "unused"])?;
        let (status, body) = self
            .client
            .send_json::<()>(Method::DELETE, url.as_str(), self.admin_headers(), None)
            .await?;
        if is_success(status) {
            self.drop_cached_tags().await;
            return parse_json(&body);
        }
        Err(mutation_error(status, &body, "tag cleanup"))
    }

    // ─── Public quote endpoints ───────────────────────────────────────────

    /// Fetch one quote by id. A quote that has disappeared is not an error
    /// worth surfacing to a reader; the service's random quote stands in.
    pub async fn fetch_quote_by_id(&self, id: &str) -> Result<Quote> {
        let url = self.endpoint(&["quotes", id])?;
        match self
            .client
            .get_json::<Quote>(url.as_str(), self.public_headers())
            .await
        {
            Ok(quote) => Ok(quote),
            Err(StoreError::NotFound(_)) => {
                tracing::info!("quote {id} not found, serving a random one instead");
                self.fetch_random_quote().await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_random_quote(&self) -> Result<Quote> {
        let url = self.endpoint(&["quotes", "random"])?;
        self.client.get_json(url.as_str(), self.public_headers()).await
    }

    /// Attach a custom share image to a quote.
    pub async fn save_custom_image(&self, id: &str, image_url: &str) -> Result<()> {
        let url = self.endpoint(&["admin", "save-custom-image"])?;
        let payload = serde_json::json!({ "quote_id": id, "image_url": image_url });
        let (status, body) = self
            .client
            .send_json(Method::POST, url.as_str(), self.admin_headers(), Some(&payload))
            .await?;
        if is_success(status) {
            return Ok(());
        }
        Err(mutation_error(status, &body, &format!("quote {id}")))
    }
}

// ─── QuoteSource ──────────────────────────────────────────────────────────────

/// Read seam consumed by the listing coordinator, so pagination and search
/// state can be driven by an in-memory source in tests.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn list(&self, params: &ListParams) -> Result<QuotePage>;
    async fn search(&self, query: &str, params: &ListParams) -> Result<QuotePage>;
}

#[async_trait]
impl QuoteSource for QuoteStore {
    async fn list(&self, params: &ListParams) -> Result<QuotePage> {
        self.list_quotes(params).await
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<QuotePage> {
        self.search_quotes(query, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn test_auth() -> StoreAuth {
        StoreAuth {
            bearer_token: Some("test-token".to_string()),
            api_key: Some("test-key".to_string()),
        }
    }

    fn test_store(server: &mockito::ServerGuard) -> QuoteStore {
        QuoteStore::with_config(&server.url(), Duration::from_secs(0), test_auth())
    }

    fn quote_json(id: &str, text: &str, author: &str) -> serde_json::Value {
        json!({
            "id": id,
            "quote": text,
            "author": author,
            "tags": ["wisdom"],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn list_quotes_sends_params_and_parses_page() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/admin/quotes")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "50".into()),
                Matcher::UrlEncoded("sort_by".into(), "created_at".into()),
                Matcher::UrlEncoded("sort_order".into(), "desc".into()),
            ]))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(
                json!({
                    "quotes": [quote_json("1", "Be yourself", "Oscar Wilde")],
                    "total_count": 12,
                    "count": 1,
                    "has_more": true,
                    "last_key": "1"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let page = store.list_quotes(&ListParams::default()).await.unwrap();
        assert_eq!(page.quotes.len(), 1);
        assert_eq!(page.quotes[0].author, "Oscar Wilde");
        assert_eq!(page.total_count, Some(12));
        assert!(page.has_more);
        assert_eq!(page.last_key.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn search_quotes_accepts_total_alias() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/admin/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "life".into()),
                Matcher::UrlEncoded("limit".into(), "25".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "quotes": [quote_json("7", "Life is life", "Anon")],
                    "total": 7,
                    "count": 1,
                    "has_more": false
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let params = ListParams::new(25, SortSpec::default());
        let page = store.search_quotes("life", &params).await.unwrap();
        assert_eq!(page.total_count, Some(7));
        assert!(!page.has_more);
        assert_eq!(page.last_key, None);
    }

    #[tokio::test]
    async fn create_quote_posts_draft_and_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/quotes")
            .match_body(Matcher::PartialJson(json!({
                "quote": "Stay hungry",
                "author": "Steve Jobs"
            })))
            .with_status(201)
            .with_body(
                json!({
                    "message": "Quote created successfully",
                    "quote": quote_json("9", "Stay hungry", "Steve Jobs")
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let draft = QuoteDraft::new("Stay hungry", "Steve Jobs");
        let quote = store.create_quote(&draft).await.unwrap();
        assert_eq!(quote.id, "9");
        assert_eq!(quote.text, "Stay hungry");
    }

    #[tokio::test]
    async fn create_quote_surfaces_duplicate_report() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/quotes")
            .with_status(409)
            .with_body(
                json!({
                    "error": "Duplicate quote detected",
                    "message": "Found 2 similar quote(s)",
                    "is_duplicate": true,
                    "duplicate_count": 2,
                    "duplicates": [
                        {
                            "id": "1",
                            "quote": "Be yourself",
                            "author": "Oscar Wilde",
                            "created_at": "2024-01-01T00:00:00Z",
                            "match_reason": "exact_match"
                        },
                        {
                            "id": "2",
                            "quote": "Be yourself.",
                            "author": "Oscar Wilde",
                            "created_at": "2024-02-01T00:00:00Z",
                            "match_reason": "similar_quote_same_author_0.92"
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let draft = QuoteDraft::new("Be yourself", "Oscar Wilde");
        match store.create_quote(&draft).await {
            Err(StoreError::DuplicateDetected(report)) => {
                assert!(report.is_duplicate);
                assert_eq!(report.duplicate_count, 2);
                assert_eq!(report.duplicates[0].match_reason.as_deref(), Some("exact_match"));
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_quote_rejects_invalid_draft_without_network() {
        // Unroutable port: any request would fail loudly.
        let store = QuoteStore::new("http://127.0.0.1:1", test_auth());
        let draft = QuoteDraft::new("   ", "Someone");
        match store.create_quote(&draft).await {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("'quote' is required")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_quote_maps_missing_quote_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PUT", "/admin/quotes/nope")
            .with_status(404)
            .with_body(json!({"error": "Quote not found"}).to_string())
            .create_async()
            .await;

        let store = test_store(&server);
        let draft = QuoteDraft::new("text", "author");
        match store.update_quote("nope", &draft).await {
            Err(StoreError::NotFound(what)) => assert!(what.contains("nope")),
            other => panic!("expected not-found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_quote_returns_confirmed_id() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("DELETE", "/admin/quotes/abc")
            .with_status(200)
            .with_body(
                json!({
                    "message": "Quote deleted successfully",
                    "deleted_quote_id": "abc"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let deleted = store.delete_quote("abc").await.unwrap();
        assert_eq!(deleted, "abc");
    }

    #[tokio::test]
    async fn check_duplicate_parses_clean_verdict() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/check-duplicate")
            .match_body(Matcher::PartialJson(json!({
                "quote": "Fresh words",
                "author": "Nobody"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "is_duplicate": false,
                    "duplicate_count": 0,
                    "duplicates": [],
                    "message": "No duplicates found"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let report = store.check_duplicate("Fresh words", "Nobody").await.unwrap();
        assert!(!report.is_duplicate);
        assert_eq!(report.duplicate_count, 0);
    }

    #[tokio::test]
    async fn tags_with_metadata_parses_list() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/admin/tags")
            .with_status(200)
            .with_body(
                json!({
                    "tags": [
                        {"name": "wisdom", "tag": "wisdom", "quote_count": 4},
                        {"name": "life", "tag": "life", "quote_count": 2}
                    ],
                    "count": 2
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let tags = store.get_tags_with_metadata().await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "wisdom");
        assert_eq!(tags[0].quote_count, 4);
    }

    #[tokio::test]
    async fn get_tags_returns_bare_names() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/admin/tags")
            .with_status(200)
            .with_body(
                json!({
                    "tags": [
                        {"name": "wisdom", "tag": "wisdom", "quote_count": 4},
                        {"name": "life", "tag": "life", "quote_count": 2}
                    ],
                    "count": 2
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let names = store.get_tags().await.unwrap();
        assert_eq!(names, vec!["wisdom", "life"]);
    }

    #[tokio::test]
    async fn add_tag_conflict_becomes_validation_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/admin/tags")
            .with_status(400)
            .with_body(json!({"error": "Tag 'wisdom' already exists"}).to_string())
            .create_async()
            .await;

        let store = test_store(&server);
        match store.add_tag("wisdom").await {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("already exists")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_tag_encodes_path_and_counts_updates() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PUT", "/admin/tags/old%20tag")
            .match_body(Matcher::PartialJson(json!({"tag": "new-tag"})))
            .with_status(200)
            .with_body(
                json!({
                    "message": "Tag renamed",
                    "old_tag": "old tag",
                    "new_tag": "new-tag",
                    "quotes_updated": 3,
                    "all_tags": ["new-tag", "wisdom"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let updated = store.rename_tag("old tag", "new-tag").await.unwrap();
        assert_eq!(updated, 3);
    }

    #[tokio::test]
    async fn cleanup_unused_tags_parses_report() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("DELETE", "/admin/tags/unused")
            .with_status(200)
            .with_body(
                json!({
                    "message": "Removed 2 unused tag(s)",
                    "removed_tags": ["stale", "orphan"],
                    "remaining_tags": ["wisdom"],
                    "count_removed": 2,
                    "count_remaining": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = test_store(&server);
        let report = store.cleanup_unused_tags().await.unwrap();
        assert_eq!(report.count_removed, 2);
        assert_eq!(report.removed_tags, vec!["stale", "orphan"]);
        assert_eq!(report.remaining_tags, vec!["wisdom"]);
    }

    #[tokio::test]
    async fn fetch_quote_by_id_falls_back_to_random() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/quotes/ghost")
            .match_header("x-api-key", "test-key")
            .with_status(404)
            .create_async()
            .await;
        let _random = server
            .mock("GET", "/quotes/random")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_body(quote_json("42", "Carpe diem", "Horace").to_string())
            .create_async()
            .await;

        let store = test_store(&server);
        let quote = store.fetch_quote_by_id("ghost").await.unwrap();
        assert_eq!(quote.id, "42");
        assert_eq!(quote.author, "Horace");
    }

    #[tokio::test]
    async fn save_custom_image_posts_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/admin/save-custom-image")
            .match_body(Matcher::PartialJson(json!({
                "quote_id": "9",
                "image_url": "https://img.example/9.png"
            })))
            .with_status(200)
            .with_body(json!({"message": "Image saved"}).to_string())
            .create_async()
            .await;

        let store = test_store(&server);
        store
            .save_custom_image("9", "https://img.example/9.png")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
