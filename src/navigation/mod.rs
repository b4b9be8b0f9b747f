use thiserror::Error;
use tokio::sync::mpsc;

pub const QUERY_PARAM: &str = "q";
pub const FILTER_PARAM: &str = "filter";
pub const PAGE_PARAM: &str = "page";

const BASE: &str = "http://localhost/";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("invalid location '{location}'")]
    InvalidLocation { location: String },

    #[error("invalid page '{value}', expected positive integer")]
    InvalidPage { value: String },
}

/// Projection of a search session that is written to and read back from the
/// navigation history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub query: String,
    pub filter: Option<String>,
    pub page: Option<u32>,
}

impl NavigationSnapshot {
    pub fn to_location(&self) -> String {
        let mut url = match reqwest::Url::parse(BASE) {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(QUERY_PARAM, &self.query);
            if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty()) {
                pairs.append_pair(FILTER_PARAM, filter);
            }
            pairs.append_pair(PAGE_PARAM, &self.page.unwrap_or(1).to_string());
        }
        format!("?{}", url.query().unwrap_or_default())
    }

    /// Strict decoding: a page that is present must be a positive integer.
    pub fn from_location(location: &str) -> Result<Self, NavigationError> {
        let pairs = location_pairs(location)?;
        let mut snapshot = NavigationSnapshot::default();
        for (key, value) in pairs {
            match key.as_str() {
                QUERY_PARAM => snapshot.query = value,
                FILTER_PARAM => {
                    snapshot.filter = Some(value).filter(|v| !v.trim().is_empty());
                }
                PAGE_PARAM => snapshot.page = Some(parse_page(&value)?),
                _ => {}
            }
        }
        Ok(snapshot)
    }

    /// Lenient decoding used for deep links: anything unreadable falls back to
    /// the defaults.
    pub fn from_location_lossy(location: &str) -> Self {
        let pairs = location_pairs(location).unwrap_or_default();
        let mut snapshot = NavigationSnapshot::default();
        for (key, value) in pairs {
            match key.as_str() {
                QUERY_PARAM => snapshot.query = value,
                FILTER_PARAM => {
                    snapshot.filter = Some(value).filter(|v| !v.trim().is_empty());
                }
                PAGE_PARAM => snapshot.page = parse_page(&value).ok(),
                _ => {}
            }
        }
        snapshot
    }
}

fn location_pairs(location: &str) -> Result<Vec<(String, String)>, NavigationError> {
    let trimmed = location.trim();
    let query = match trimmed.find('?') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    let mut url = reqwest::Url::parse(BASE).map_err(|_| NavigationError::InvalidLocation {
        location: location.to_string(),
    })?;
    url.set_query(Some(query));
    Ok(url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

pub fn parse_page(value: &str) -> Result<u32, NavigationError> {
    match value.trim().parse::<u32>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(NavigationError::InvalidPage {
            value: value.to_string(),
        }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEvent {
    pub location: String,
}

/// History the session reads from and writes to.
pub trait NavigationAdapter {
    fn state(&self) -> NavigationSnapshot;

    fn push_state(&mut self, snapshot: NavigationSnapshot, location: String);

    fn replace_state(&mut self, snapshot: NavigationSnapshot, location: String);

    fn on_change(&mut self, listener: mpsc::UnboundedSender<NavigationEvent>);

    /// Whether `push_state` will itself be reported through `on_change`.
    fn echoes_push(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    snapshot: NavigationSnapshot,
    location: String,
}

/// In-process history stack. Pushes and back/forward moves are reported to
/// every open listener; with none registered, pushes echo nothing.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    listeners: Vec<mpsc::UnboundedSender<NavigationEvent>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn location(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|e| e.location.as_str())
    }

    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.cursor -= 1;
        self.notify();
        true
    }

    pub fn forward(&mut self) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.cursor += 1;
        self.notify();
        true
    }

    fn notify(&mut self) {
        let location = self.location().unwrap_or_default().to_string();
        self.listeners.retain(|tx| {
            tx.send(NavigationEvent {
                location: location.clone(),
            })
            .is_ok()
        });
    }
}

impl NavigationAdapter for MemoryHistory {
    fn state(&self) -> NavigationSnapshot {
        self.entries
            .get(self.cursor)
            .map(|e| e.snapshot.clone())
            .unwrap_or_default()
    }

    fn push_state(&mut self, snapshot: NavigationSnapshot, location: String) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(HistoryEntry { snapshot, location });
        self.cursor = self.entries.len() - 1;
        self.notify();
    }

    fn replace_state(&mut self, snapshot: NavigationSnapshot, location: String) {
        let entry = HistoryEntry { snapshot, location };
        match self.entries.get_mut(self.cursor) {
            Some(current) => *current = entry,
            None => {
                self.entries.push(entry);
                self.cursor = self.entries.len() - 1;
            }
        }
    }

    fn on_change(&mut self, listener: mpsc::UnboundedSender<NavigationEvent>) {
        self.listeners.push(listener);
    }

    fn echoes_push(&self) -> bool {
        self.listeners.iter().any(|tx| !tx.is_closed())
    }
}
