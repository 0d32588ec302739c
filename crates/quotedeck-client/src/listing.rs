use std::sync::Arc;

use tokio::sync::Mutex;

use quotedeck_core::{Quote, SortField, SortSpec};

use crate::error::Result;
use crate::store::{ListParams, QuotePage, QuoteSource};

/// Where the listing currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// Nothing requested yet.
    Idle,
    /// First page of a fresh view in flight.
    Loading,
    /// A view is on screen.
    Loaded,
    /// A follow-up page in flight; current items stay visible.
    LoadingMore,
}

/// Read-only copy of the listing state at one moment.
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    pub items: Vec<Quote>,
    pub phase: ListPhase,
    pub query: Option<String>,
    pub sort: SortSpec,
    pub has_more: bool,
    pub total_count: Option<usize>,
    pub error: Option<String>,
}

struct ListingState {
    items: Vec<Quote>,
    phase: ListPhase,
    query: Option<String>,
    sort: SortSpec,
    cursor: Option<String>,
    has_more: bool,
    total_count: Option<usize>,
    error: Option<String>,
    /// Bumped on every fresh view. A response fetched under an older value
    /// is thrown away instead of clobbering the newer view.
    generation: u64,
}

/// Coordinates the browse and search views over a [`QuoteSource`]: first
/// pages, cursor continuation, sort changes, and stale-response discard.
///
/// An error never wipes what is already on screen; it lands in
/// [`ListingSnapshot::error`] next to the existing items.
pub struct QuoteListing {
    source: Arc<dyn QuoteSource>,
    page_size: usize,
    state: Mutex<ListingState>,
}

impl QuoteListing {
    pub fn new(source: Arc<dyn QuoteSource>, page_size: usize, sort: SortSpec) -> Self {
        Self {
            source,
            page_size,
            state: Mutex::new(ListingState {
                items: Vec::new(),
                phase: ListPhase::Idle,
                query: None,
                sort,
                cursor: None,
                has_more: false,
                total_count: None,
                error: None,
                generation: 0,
            }),
        }
    }

    /// Re-request the current view from its first page.
    pub async fn refresh(&self) {
        let (generation, query, params) = {
            let mut st = self.state.lock().await;
            st.generation += 1;
            st.phase = ListPhase::Loading;
            st.error = None;
            st.cursor = None;
            let params = ListParams::new(self.page_size, st.sort);
            (st.generation, st.query.clone(), params)
        };

        let result = self.fetch(query.as_deref(), &params).await;

        let mut st = self.state.lock().await;
        if st.generation != generation {
            tracing::debug!("discarding stale first page (generation {generation})");
            return;
        }
        match result {
            Ok(page) => {
                st.items = page.quotes;
                st.cursor = page.last_key;
                st.has_more = page.has_more;
                st.total_count = page.total_count;
                st.error = None;
                st.phase = ListPhase::Loaded;
            }
            Err(e) => {
                st.error = Some(e.to_string());
                st.phase = ListPhase::Loaded;
            }
        }
    }

    /// Fetch the next page and append it. Ignored unless a loaded view still
    /// has more to give and holds a cursor.
    pub async fn load_more(&self) {
        let (generation, query, params) = {
            let mut st = self.state.lock().await;
            if st.phase != ListPhase::Loaded || !st.has_more || st.cursor.is_none() {
                return;
            }
            st.phase = ListPhase::LoadingMore;
            let mut params = ListParams::new(self.page_size, st.sort);
            params.cursor = st.cursor.clone();
            (st.generation, st.query.clone(), params)
        };

        let result = self.fetch(query.as_deref(), &params).await;

        let mut st = self.state.lock().await;
        if st.generation != generation {
            tracing::debug!("discarding stale continuation (generation {generation})");
            return;
        }
        match result {
            Ok(page) => {
                st.items.extend(page.quotes);
                st.cursor = page.last_key;
                st.has_more = page.has_more;
                if page.total_count.is_some() {
                    st.total_count = page.total_count;
                }
                st.phase = ListPhase::Loaded;
            }
            Err(e) => {
                st.error = Some(e.to_string());
                st.phase = ListPhase::Loaded;
            }
        }
    }

    /// Switch between browsing and searching. Empty or whitespace-only text
    /// returns to the browse view. Either way the view restarts from its
    /// first page under the persisted sort.
    pub async fn set_query(&self, text: &str) {
        {
            let mut st = self.state.lock().await;
            let trimmed = text.trim();
            st.query = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        self.refresh().await;
    }

    /// Apply a sort-control click and reissue the current view from page
    /// one. Returns the resulting spec so callers can persist it.
    pub async fn set_sort(&self, field: SortField) -> SortSpec {
        let spec = {
            let mut st = self.state.lock().await;
            st.sort.select(field);
            st.sort
        };
        self.refresh().await;
        spec
    }

    pub async fn snapshot(&self) -> ListingSnapshot {
        let st = self.state.lock().await;
        ListingSnapshot {
            items: st.items.clone(),
            phase: st.phase,
            query: st.query.clone(),
            sort: st.sort,
            has_more: st.has_more,
            total_count: st.total_count,
            error: st.error.clone(),
        }
    }

    async fn fetch(&self, query: Option<&str>, params: &ListParams) -> Result<QuotePage> {
        match query {
            Some(q) => self.source.search(q, params).await,
            None => self.source.list(params).await,
        }
    }
}
