pub mod state;

use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::{BackendError, SearchBackend, SearchRequest};
use crate::navigation::{NavigationAdapter, NavigationSnapshot};
use crate::query::{self, Category, TagRef};
use crate::status::{MessageKind, Severity, StatusBoard, StatusMessage};

pub use state::{SearchState, SearchView, DEFAULT_RESULTS_PER_PAGE};

const CLAIM_MESSAGE_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub results_per_page: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }
}

/// Monotonic request numbering. Only the most recently issued request may
/// write its response into the session.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }
}

pub struct SearchSession<B, N> {
    backend: B,
    navigation: N,
    state: SearchState,
    status: StatusBoard,
    sequence: RequestSequence,
    pending_echoes: usize,
    scroll_to_top: bool,
}

impl<B, N> SearchSession<B, N>
where
    B: SearchBackend,
    N: NavigationAdapter,
{
    pub fn new(options: SessionOptions, backend: B, navigation: N) -> Self {
        let state = SearchState {
            results_per_page: options.results_per_page,
            ..SearchState::default()
        };
        Self {
            backend,
            navigation,
            state,
            status: StatusBoard::default(),
            sequence: RequestSequence::default(),
            pending_echoes: 0,
            scroll_to_top: false,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn view(&self) -> SearchView {
        self.state.view()
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn navigation(&self) -> &N {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut N {
        &mut self.navigation
    }

    /// Returns and resets the pending scroll-to-top request from pagination.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_top)
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.state.query = text.into();
    }

    pub fn set_results_per_page(&mut self, size: u32) {
        self.state.results_per_page = size;
    }

    pub async fn submit(&mut self) -> Result<(), BackendError> {
        self.state.search_started = false;
        self.state.total_results = 0;
        self.state.current_page = 1;
        self.search(false, false).await
    }

    pub async fn filter_by(&mut self, category: Category) -> Result<(), BackendError> {
        self.state.search_started = false;
        self.state.current_page = 1;
        self.state.active_category = Some(category);
        self.search(false, false).await
    }

    pub async fn add_tag(&mut self, tag: impl Into<TagRef>) -> Result<(), BackendError> {
        let tag = tag.into();
        self.state.current_page = 1;
        self.state.query = query::append_tag(&self.state.query, &tag);
        self.search(false, false).await
    }

    pub async fn paginate(&mut self, delta: i64) -> Result<(), BackendError> {
        self.scroll_to_top = true;
        let page = i64::from(self.state.current_page).saturating_add(delta);
        self.state.current_page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        self.search(false, false).await
    }

    pub async fn next_page(&mut self) -> Result<(), BackendError> {
        self.paginate(1).await
    }

    pub async fn prev_page(&mut self) -> Result<(), BackendError> {
        self.paginate(-1).await
    }

    /// Sends the current query and replaces results, categories and tags with
    /// the response. A page past the end is clamped and fetched again; with
    /// `validate_after` an empty filter also falls back to the first
    /// category. Failures are recorded on the status board and returned.
    pub async fn search(
        &mut self,
        suppress_history_push: bool,
        validate_after: bool,
    ) -> Result<(), BackendError> {
        let mut revalidate = true;
        loop {
            let seq = self.sequence.issue();
            let request = self.build_request();
            debug!(
                seq,
                query = %request.query,
                from = request.from,
                size = request.size,
                "search"
            );

            let result = self.backend.search(&request).await;

            // Always current while searches run one at a time under `&mut self`.
            if !self.sequence.is_current(seq) {
                warn!(seq, "discarding stale search response");
                return Ok(());
            }

            match result {
                Ok(response) => {
                    self.state.apply_response(response);
                    self.status.clear();
                }
                Err(e) => {
                    warn!(error = %e, "search failed");
                    self.state.apply_failure();
                    self.status.set(MessageKind::SearchFailed.message());
                    return Err(e);
                }
            }

            if revalidate {
                revalidate = false;
                let changed = if validate_after {
                    self.revalidate()
                } else {
                    self.state.clamp_page()
                };
                if changed {
                    debug!(page = self.state.current_page, "re-issuing search");
                    continue;
                }
            }

            if !suppress_history_push {
                self.push_navigation_snapshot();
            }
            return Ok(());
        }
    }

    /// Consistency check for state restored from a deep link: fall back to a
    /// populated category, then clamp the page, re-searching if either moved.
    pub async fn validate_after_load(&mut self) -> Result<(), BackendError> {
        if self.revalidate() {
            return self.search(true, false).await;
        }
        Ok(())
    }

    fn revalidate(&mut self) -> bool {
        if self.state.fall_back_to_populated_category() {
            return true;
        }
        self.state.clamp_page()
    }

    fn build_request(&self) -> SearchRequest {
        let view = self.state.view();
        SearchRequest {
            query: query::build_full_query(&view.composite_query),
            from: view.current_index,
            size: self.state.results_per_page,
        }
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            query: self.state.query.clone(),
            filter: self.state.filter_alias().map(str::to_string),
            page: Some(self.state.current_page),
        }
    }

    /// Pushes the current state unless it matches the entry already shown.
    pub fn push_navigation_snapshot(&mut self) {
        let snapshot = self.snapshot();
        if self.navigation.state() == snapshot {
            debug!("navigation state unchanged; not pushing");
            return;
        }
        let location = snapshot.to_location();
        if self.navigation.echoes_push() {
            self.pending_echoes += 1;
        }
        debug!(location = %location, "push navigation state");
        self.navigation.push_state(snapshot, location);
    }

    pub fn restore_from_navigation(&mut self) {
        let snapshot = self.navigation.state();
        self.state.current_page = snapshot.page.unwrap_or(1).max(1);
        self.state.active_category = Some(match snapshot.filter.as_deref() {
            Some(alias) if !alias.trim().is_empty() && !query::is_total_alias(alias) => {
                Category::from_filter_alias(alias)
            }
            _ => Category::total(0),
        });
        self.state.query = snapshot.query;
    }

    /// History-change notification. Echoes of our own pushes are swallowed;
    /// real back/forward moves restore that entry and search without pushing.
    /// Returns whether the entry was restored.
    pub async fn handle_navigation_change(&mut self) -> Result<bool, BackendError> {
        if self.pending_echoes > 0 {
            self.pending_echoes -= 1;
            return Ok(false);
        }
        self.restore_from_navigation();
        self.search(true, false).await?;
        Ok(true)
    }

    /// Initial load from a location such as `?q=brian&filter=project&page=2`.
    pub async fn load_initial(&mut self, location: &str) -> Result<(), BackendError> {
        let snapshot = NavigationSnapshot::from_location_lossy(location);
        let canonical = snapshot.to_location();
        self.navigation.replace_state(snapshot, canonical);
        self.restore_from_navigation();
        self.search(true, true).await
    }

    /// Promotes a result and returns the URL to follow.
    pub async fn claim(&mut self, id: &str) -> Result<String, BackendError> {
        match self.backend.claim(id).await {
            Ok(resp) => {
                self.status.set(
                    StatusMessage::new(format!("Claimed {id}."), Severity::Success)
                        .clear_after(CLAIM_MESSAGE_DELAY),
                );
                Ok(resp.url)
            }
            Err(e) => {
                warn!(error = %e, id, "claim failed");
                let kind = MessageKind::from_status(e.status(), MessageKind::AuthFailed);
                self.status.set(kind.message());
                Err(e)
            }
        }
    }
}
