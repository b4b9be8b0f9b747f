use serde_json::Value;

use crate::backend::SearchResponse;
use crate::query::{self, Category, Tag};

pub const DEFAULT_RESULTS_PER_PAGE: u32 = 10;

/// Everything a search session owns. Mutated only by `SearchSession`.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub query: String,
    pub active_category: Option<Category>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub tag_max_count: u64,
    pub current_page: u32,
    pub results_per_page: u32,
    pub total_results: u64,
    pub results: Vec<Value>,
    pub search_started: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            active_category: None,
            categories: Vec::new(),
            tags: Vec::new(),
            tag_max_count: 1,
            current_page: 1,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
            total_results: 0,
            results: Vec::new(),
            search_started: false,
        }
    }
}

/// Values derived from `SearchState`, recomputed on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchView {
    pub total_pages: u64,
    pub next_page_exists: bool,
    pub prev_page_exists: bool,
    pub current_index: u64,
    pub nav_location: String,
    pub composite_query: String,
}

pub fn total_pages(total_results: u64, results_per_page: u32) -> u64 {
    let per_page = u64::from(results_per_page.max(1));
    total_results.div_ceil(per_page)
}

pub fn current_index(current_page: u32, results_per_page: u32) -> u64 {
    u64::from(results_per_page) * u64::from(current_page.saturating_sub(1))
}

impl SearchState {
    pub fn view(&self) -> SearchView {
        let total_pages = total_pages(self.total_results, self.results_per_page);
        let page = u64::from(self.current_page);
        SearchView {
            total_pages,
            next_page_exists: total_pages > 1 && page < total_pages,
            prev_page_exists: total_pages > 1 && page > 1,
            current_index: current_index(self.current_page, self.results_per_page),
            nav_location: format!("Page {} of {}", self.current_page, total_pages),
            composite_query: self.composite_query(),
        }
    }

    pub fn composite_query(&self) -> String {
        query::composite_text(&self.query, self.active_category.as_ref())
    }

    pub fn filter_alias(&self) -> Option<&str> {
        self.active_category.as_ref().and_then(Category::filter_alias)
    }

    pub fn category_by_alias(&self, alias: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.alias.eq_ignore_ascii_case(alias) || c.raw_name.eq_ignore_ascii_case(alias))
    }

    pub(crate) fn apply_response(&mut self, response: SearchResponse) {
        let SearchResponse {
            results,
            counts,
            type_aliases,
            tags,
        } = response;

        let mut categories: Vec<Category> = counts
            .into_iter()
            .map(|(raw, count)| {
                let alias = type_aliases.get(&raw).cloned().unwrap_or_else(|| raw.clone());
                Category::new(&raw, count.unwrap_or(0), &alias)
            })
            .collect();
        query::sort_categories(&mut categories);

        self.total_results = match self.active_category.as_ref() {
            Some(active) => categories
                .iter()
                .find(|c| c.raw_name == active.raw_name)
                .map(|c| c.count)
                .unwrap_or(0),
            None => categories.first().map(|c| c.count).unwrap_or(0),
        };

        self.tag_max_count = tags.iter().fold(1, |max, t| max.max(t.doc_count));
        self.tags = tags
            .into_iter()
            .map(|t| Tag {
                name: t.key,
                count: t.doc_count,
            })
            .collect();
        self.results = results;
        self.categories = categories;
        self.search_started = true;
    }

    pub(crate) fn apply_failure(&mut self) {
        self.results.clear();
        self.total_results = 0;
        self.current_page = 1;
    }

    /// Pulls `current_page` back inside `1..=max(total_pages, 1)`. Returns
    /// whether it moved.
    pub(crate) fn clamp_page(&mut self) -> bool {
        let last = total_pages(self.total_results, self.results_per_page).max(1);
        let last = u32::try_from(last).unwrap_or(u32::MAX);
        if self.current_page > last {
            self.current_page = last;
            return true;
        }
        if self.current_page == 0 {
            self.current_page = 1;
            return true;
        }
        false
    }

    /// When the active filter has no results in the current response, fall
    /// back to the first category. Returns whether the filter changed.
    pub(crate) fn fall_back_to_populated_category(&mut self) -> bool {
        let active = match self.active_category.as_ref() {
            Some(active) => active,
            None => return false,
        };
        let populated = self
            .categories
            .iter()
            .any(|c| c.count > 0 && c.alias == active.alias);
        if populated {
            return false;
        }
        match self.categories.first() {
            Some(first) if first.alias != active.alias => {
                self.active_category = Some(first.clone());
                self.current_page = 1;
                true
            }
            _ => false,
        }
    }
}
