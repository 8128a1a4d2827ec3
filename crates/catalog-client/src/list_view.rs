use crate::catalog::CatalogApi;
use crate::error::{ApiError, StorageError};
use crate::models::{Movie, MovieFilter, Page, SortDirection, SortField};
use crate::storage::{lock, KeyValueStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const KEY_LIST_STATE: &str = "movie_list_state";
pub const LIST_STATE_VERSION: u32 = 1;

/// Where list pages come from. [`CatalogApi`] in production.
#[async_trait]
pub trait MoviePageSource: Send + Sync {
    async fn search(&self, text: &str, page: u32, page_size: u32) -> Result<Page<Movie>, ApiError>;
    async fn filter(
        &self,
        filter: &MovieFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Movie>, ApiError>;
}

#[async_trait]
impl MoviePageSource for CatalogApi {
    async fn search(&self, text: &str, page: u32, page_size: u32) -> Result<Page<Movie>, ApiError> {
        self.search_movies(text, page, page_size).await
    }

    async fn filter(
        &self,
        filter: &MovieFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Movie>, ApiError> {
        self.filter_movies(filter, page, page_size).await
    }
}

/// Which endpoint governs the list. Search carries its own text, so a search
/// mode with no text cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryMode {
    Search {
        text: String,
    },
    #[default]
    Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub mode: QueryMode,
    /// Retained while searching so that clearing the search restores it.
    pub filter: MovieFilter,
    pub current_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            mode: QueryMode::Filter,
            filter: MovieFilter::default(),
            current_page: 1,
        }
    }
}

impl ListQuery {
    pub fn search_text(&self) -> Option<&str> {
        match &self.mode {
            QueryMode::Search { text } => Some(text),
            QueryMode::Filter => None,
        }
    }

    fn is_valid(&self) -> bool {
        self.current_page >= 1
            && match &self.mode {
                QueryMode::Search { text } => !text.trim().is_empty(),
                QueryMode::Filter => true,
            }
    }
}

/// One editable field of the filter form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FilterField {
    GenreId(Option<i64>),
    YearMin(Option<i32>),
    YearMax(Option<i32>),
    RatingMin(Option<f64>),
    SortBy(SortField),
    SortDirection(SortDirection),
}

impl FilterField {
    fn apply(self, filter: &mut MovieFilter) {
        match self {
            Self::GenreId(v) => filter.genre_id = v,
            Self::YearMin(v) => filter.year_min = v,
            Self::YearMax(v) => filter.year_max = v,
            Self::RatingMin(v) => filter.rating_min = v,
            Self::SortBy(v) => filter.sort_by = v,
            Self::SortDirection(v) => filter.sort_direction = v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationView {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_previous: bool,
    pub has_next: bool,
    /// False when everything fits on one page.
    pub show_controls: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub query: ListQuery,
    pub items: Vec<Movie>,
    pub pagination: PaginationView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ListUpdate {
    /// A fetch completed and its page is now current.
    Applied { snapshot: ListSnapshot },
    /// Nothing was fetched: navigation out of range, or a filter edit while searching.
    Skipped,
    /// The fetch completed after the query had moved on; its result was dropped.
    Stale,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedListState {
    version: u32,
    query: ListQuery,
}

struct ViewState {
    query: ListQuery,
    total_pages: u32,
    total_items: u64,
    items: Vec<Movie>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            query: ListQuery::default(),
            total_pages: 1,
            total_items: 0,
            items: Vec::new(),
        }
    }
}

impl ViewState {
    fn pagination(&self) -> PaginationView {
        let current = self.query.current_page;
        PaginationView {
            current_page: current,
            total_pages: self.total_pages,
            total_items: self.total_items,
            has_previous: current > 1,
            has_next: current < self.total_pages,
            show_controls: self.total_pages > 1,
        }
    }

    fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            query: self.query.clone(),
            items: self.items.clone(),
            pagination: self.pagination(),
        }
    }
}

pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Drives the movie list: search/filter mode, page cursor, persistence across
/// restarts, and discarding of fetches that finish after the query moved on.
pub struct ListViewCoordinator {
    source: Arc<dyn MoviePageSource>,
    store: Arc<dyn KeyValueStore>,
    page_size: u32,
    state: Mutex<ViewState>,
}

impl ListViewCoordinator {
    pub fn new(
        source: Arc<dyn MoviePageSource>,
        store: Arc<dyn KeyValueStore>,
        page_size: u32,
    ) -> Self {
        Self {
            source,
            store,
            page_size: page_size.max(1),
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn query(&self) -> ListQuery {
        lock(&self.state).query.clone()
    }

    pub fn pagination(&self) -> PaginationView {
        lock(&self.state).pagination()
    }

    pub fn snapshot(&self) -> ListSnapshot {
        lock(&self.state).snapshot()
    }

    /// Repopulates the query from storage. Returns whether a persisted state
    /// was applied; anything unreadable is dropped and defaults stay in place.
    /// Never fetches.
    pub fn restore(&self) -> bool {
        let raw = match self.store.get(KEY_LIST_STATE) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "failed to read persisted list state");
                return false;
            }
        };

        let restored = serde_json::from_str::<PersistedListState>(&raw)
            .ok()
            .filter(|p| p.version == LIST_STATE_VERSION && p.query.is_valid());

        let mut state = lock(&self.state);
        match restored {
            Some(persisted) => {
                state.total_pages = persisted.query.current_page;
                state.total_items = 0;
                state.items.clear();
                state.query = persisted.query;
                debug!(page = state.query.current_page, "list state restored");
                true
            }
            None => {
                warn!("persisted list state is malformed; resetting to defaults");
                *state = ViewState::default();
                if let Err(e) = self.store.remove(KEY_LIST_STATE) {
                    warn!(error = %e, "failed to drop malformed list state");
                }
                false
            }
        }
    }

    fn persist(&self, query: &ListQuery) {
        let persisted = PersistedListState {
            version: LIST_STATE_VERSION,
            query: query.clone(),
        };
        let result = serde_json::to_string(&persisted)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(KEY_LIST_STATE, &raw));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist list state");
        }
    }

    /// Applies `change` to the query, persists it, and returns the new query.
    fn mutate(&self, change: impl FnOnce(&mut ListQuery)) -> ListQuery {
        let mut state = lock(&self.state);
        change(&mut state.query);
        self.persist(&state.query);
        state.query.clone()
    }

    async fn load(&self, query: &ListQuery) -> Result<Page<Movie>, ApiError> {
        match &query.mode {
            QueryMode::Search { text } => {
                self.source
                    .search(text, query.current_page, self.page_size)
                    .await
            }
            QueryMode::Filter => {
                self.source
                    .filter(&query.filter, query.current_page, self.page_size)
                    .await
            }
        }
    }

    /// Loads `query` and applies the page if the query is still current. A page
    /// past the reported end is clamped to the last page, which is then loaded
    /// in its place.
    async fn fetch(&self, mut query: ListQuery) -> Result<ListUpdate, ApiError> {
        loop {
            let result = self.load(&query).await;

            let mut state = lock(&self.state);
            if state.query != query {
                debug!(page = query.current_page, "discarding stale list fetch");
                return Ok(ListUpdate::Stale);
            }
            let page = result?;

            state.total_items = page.total_items;
            state.total_pages = total_pages(page.total_items, self.page_size);
            if state.query.current_page <= state.total_pages {
                state.items = page.items;
                return Ok(ListUpdate::Applied {
                    snapshot: state.snapshot(),
                });
            }

            debug!(
                page = state.query.current_page,
                total_pages = state.total_pages,
                "page past the end; loading the last page"
            );
            state.query.current_page = state.total_pages;
            self.persist(&state.query);
            query = state.query.clone();
        }
    }

    /// Re-fetches the current query, e.g. right after [`restore`](Self::restore).
    pub async fn refresh(&self) -> Result<ListUpdate, ApiError> {
        let query = self.query();
        self.fetch(query).await
    }

    /// Non-blank text selects search mode, blank text selects filter mode.
    /// Either way the cursor returns to page 1.
    pub async fn set_search_text(&self, text: &str) -> Result<ListUpdate, ApiError> {
        let text = text.trim();
        let query = self.mutate(|q| {
            q.mode = if text.is_empty() {
                QueryMode::Filter
            } else {
                QueryMode::Search {
                    text: text.to_string(),
                }
            };
            q.current_page = 1;
        });
        self.fetch(query).await
    }

    /// Edits one filter field. While searching the value is only remembered.
    pub async fn set_filter_field(&self, field: FilterField) -> Result<ListUpdate, ApiError> {
        let query = self.mutate(|q| {
            field.apply(&mut q.filter);
            if q.mode == QueryMode::Filter {
                q.current_page = 1;
            }
        });
        if query.mode != QueryMode::Filter {
            return Ok(ListUpdate::Skipped);
        }
        self.fetch(query).await
    }

    /// Out-of-range targets (below 1, or past the last known page) are ignored.
    pub async fn go_to_page(&self, page: u32) -> Result<ListUpdate, ApiError> {
        let query = {
            let mut state = lock(&self.state);
            if page < 1 || page > state.total_pages {
                debug!(page, total_pages = state.total_pages, "page out of range");
                return Ok(ListUpdate::Skipped);
            }
            state.query.current_page = page;
            self.persist(&state.query);
            state.query.clone()
        };
        self.fetch(query).await
    }

    pub async fn first_page(&self) -> Result<ListUpdate, ApiError> {
        self.go_to_page(1).await
    }

    pub async fn previous_page(&self) -> Result<ListUpdate, ApiError> {
        let current = self.pagination().current_page;
        self.go_to_page(current.saturating_sub(1)).await
    }

    pub async fn next_page(&self) -> Result<ListUpdate, ApiError> {
        let current = self.pagination().current_page;
        self.go_to_page(current.saturating_add(1)).await
    }

    pub async fn last_page(&self) -> Result<ListUpdate, ApiError> {
        let last = self.pagination().total_pages;
        self.go_to_page(last).await
    }

    /// Forgets everything, persisted state included, and loads page 1 of the
    /// default filter.
    pub async fn reset_all(&self) -> Result<ListUpdate, ApiError> {
        let query = {
            let mut state = lock(&self.state);
            *state = ViewState::default();
            if let Err(e) = self.store.remove(KEY_LIST_STATE) {
                warn!(error = %e, "failed to clear persisted list state");
            }
            state.query.clone()
        };
        self.fetch(query).await
    }
}
