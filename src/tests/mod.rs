use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::backend::{
    BackendError, ClaimResponse, SearchBackend, SearchRequest, SearchResponse, TagBucket,
};
use crate::navigation::{MemoryHistory, NavigationAdapter, NavigationSnapshot};
use crate::query::{Category, Tag};
use crate::session::{SearchSession, SessionOptions};
use crate::status::{MessageKind, Severity};

type Responder = dyn Fn(&SearchRequest) -> Result<SearchResponse, BackendError> + Send + Sync;

struct MockBackend {
    responder: Box<Responder>,
    requests: Mutex<Vec<SearchRequest>>,
    claim_status: Option<u16>,
}

impl MockBackend {
    fn new(
        responder: impl Fn(&SearchRequest) -> Result<SearchResponse, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            claim_status: None,
        }
    }

    fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn froms(&self) -> Vec<u64> {
        self.requests().iter().map(|r| r.from).collect()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }

    async fn claim(&self, id: &str) -> Result<ClaimResponse, BackendError> {
        match self.claim_status {
            Some(status) => Err(BackendError::Status {
                url: format!("http://app/metadata/{id}/promote/"),
                status,
            }),
            None => Ok(ClaimResponse {
                url: format!("http://app/{id}/"),
            }),
        }
    }
}

fn query_text(request: &SearchRequest) -> String {
    request.query["filtered"]["query"]["query_string"]["query"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Responds like an index holding `total` documents split between projects
/// and users.
fn catalog(total: u64, projects: u64, users: u64) -> impl Fn(&SearchRequest) -> Result<SearchResponse, BackendError> {
    move |req: &SearchRequest| {
        let remaining = total.saturating_sub(req.from);
        let n = remaining.min(u64::from(req.size));
        Ok(SearchResponse {
            results: (0..n)
                .map(|i| json!({"title": format!("result {}", req.from + i)}))
                .collect(),
            counts: HashMap::from([
                ("total".to_string(), Some(total)),
                ("projects".to_string(), Some(projects)),
                ("users".to_string(), Some(users)),
            ]),
            type_aliases: HashMap::from([
                ("total".to_string(), "total".to_string()),
                ("projects".to_string(), "project".to_string()),
                ("users".to_string(), "user".to_string()),
            ]),
            tags: vec![
                TagBucket {
                    key: "psychology".to_string(),
                    doc_count: 6,
                },
                TagBucket {
                    key: "neuro".to_string(),
                    doc_count: 2,
                },
            ],
        })
    }
}

fn session_with(
    backend: MockBackend,
    results_per_page: u32,
) -> SearchSession<MockBackend, MemoryHistory> {
    SearchSession::new(
        SessionOptions { results_per_page },
        backend,
        MemoryHistory::new(),
    )
}

fn location_pairs(location: &str) -> HashMap<String, String> {
    let s = NavigationSnapshot::from_location(location).unwrap();
    let mut out = HashMap::from([("q".to_string(), s.query)]);
    if let Some(f) = s.filter {
        out.insert("filter".to_string(), f);
    }
    if let Some(p) = s.page {
        out.insert("page".to_string(), p.to_string());
    }
    out
}

#[tokio::test]
async fn paginating_a_wildcard_query_issues_expected_offsets() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.set_query("repro*");
    session.submit().await.unwrap();
    assert_eq!(session.view().total_pages, 3);
    assert_eq!(query_text(&session.backend().requests()[0]), "repro*");

    session.paginate(1).await.unwrap();
    session.paginate(1).await.unwrap();
    session.paginate(-1).await.unwrap();

    assert_eq!(session.state().current_page, 2);
    assert_eq!(session.backend().froms(), vec![0, 10, 20, 10]);
    assert_eq!(session.backend().requests().len() - 1, 3);
    assert!(session.take_scroll_request());
    assert!(!session.take_scroll_request());
}

#[tokio::test]
async fn filter_resets_to_first_page() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.set_query("brian");
    session.submit().await.unwrap();
    session.next_page().await.unwrap();
    assert_eq!(session.state().current_page, 2);

    let projects = session
        .state()
        .category_by_alias("project")
        .cloned()
        .unwrap();
    session.filter_by(projects).await.unwrap();

    let last = session.backend().requests().last().cloned().unwrap();
    assert_eq!(last.from, 0);
    assert_eq!(query_text(&last), "brian AND category:project");
    assert_eq!(session.state().current_page, 1);
    assert_eq!(session.state().total_results, 20);
    assert_eq!(session.view().total_pages, 2);
}

#[tokio::test]
async fn adding_a_tag_extends_the_query() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.set_query("brian");
    session.add_tag("psychology").await.unwrap();
    assert_eq!(session.state().query, "brian AND tags:(\"psychology\")");
    assert_eq!(
        query_text(&session.backend().requests()[0]),
        "brian AND tags:(\"psychology\")"
    );
    assert_eq!(session.state().tag_max_count, 6);

    let tag = Tag {
        name: "neuro".to_string(),
        count: 2,
    };
    session.add_tag(&tag).await.unwrap();
    assert!(session.state().query.ends_with("AND tags:(\"neuro\")"));
}

#[tokio::test]
async fn categories_come_back_total_first() {
    let mut session = session_with(MockBackend::new(catalog(50, 20, 30)), 10);
    session.submit().await.unwrap();
    let names: Vec<_> = session
        .state()
        .categories
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Total", "Users", "Projects"]);
    assert_eq!(session.state().total_results, 50);
}

#[tokio::test]
async fn failed_search_clears_results_and_reports() {
    let mut session = session_with(
        MockBackend::new(|_| {
            Err(BackendError::Status {
                url: "http://search/".to_string(),
                status: 502,
            })
        }),
        10,
    );
    session.set_query("anything");
    let err = session.submit().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(session.state().results.is_empty());
    assert_eq!(session.state().total_results, 0);
    assert_eq!(session.state().current_page, 1);
    assert!(session.navigation().is_empty());

    let message = session.status().current().cloned().unwrap();
    assert_eq!(message.text, MessageKind::SearchFailed.text());
    assert_eq!(message.severity, Severity::Danger);
}

#[tokio::test]
async fn zero_page_size_and_zero_results_do_not_divide_by_zero() {
    let mut session = session_with(MockBackend::new(catalog(0, 0, 0)), 0);
    session.submit().await.unwrap();
    let view = session.view();
    assert_eq!(view.total_pages, 0);
    assert!(!view.next_page_exists);
    assert!(!view.prev_page_exists);
    assert_eq!(session.state().current_page, 1);
    assert!(session.state().results.is_empty());
}

#[tokio::test]
async fn restore_then_push_reproduces_location() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    let original = "?q=brian&filter=project&page=2";
    session.navigation_mut().replace_state(
        NavigationSnapshot::from_location(original).unwrap(),
        original.to_string(),
    );
    session.restore_from_navigation();
    assert_eq!(session.state().query, "brian");
    assert_eq!(session.state().current_page, 2);
    assert_eq!(session.state().filter_alias(), Some("project"));
    assert!(session.backend().requests().is_empty());

    let restored = session.snapshot().to_location();
    assert_eq!(location_pairs(&restored), location_pairs(original));

    session.push_navigation_snapshot();
    assert_eq!(session.navigation().len(), 1);
    let current = session.navigation().location().unwrap().to_string();
    assert_eq!(location_pairs(&current), location_pairs(original));
}

#[tokio::test]
async fn total_filter_in_location_applies_no_clause() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session
        .load_initial("?q=brian&filter=total&page=1")
        .await
        .unwrap();

    let requests = session.backend().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(query_text(&requests[0]), "brian");
    assert_eq!(session.state().total_results, 25);
    assert!(session
        .state()
        .active_category
        .as_ref()
        .map(Category::is_total)
        .unwrap_or(false));
    assert_eq!(session.state().filter_alias(), None);
    assert_eq!(session.snapshot().filter, None);
}

#[tokio::test]
async fn selecting_total_keeps_filter_out_of_history() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.load_initial("?q=brian").await.unwrap();
    assert_eq!(query_text(&session.backend().requests()[0]), "brian");
    assert_eq!(session.state().total_results, 25);

    let projects = session
        .state()
        .category_by_alias("project")
        .cloned()
        .unwrap();
    session.filter_by(projects).await.unwrap();
    let total = session.state().categories[0].clone();
    session.filter_by(total).await.unwrap();

    let last = session.backend().requests().last().cloned().unwrap();
    assert_eq!(query_text(&last), "brian");
    assert_eq!(session.state().total_results, 25);
    let location = session.navigation().location().unwrap().to_string();
    assert!(!location_pairs(&location).contains_key("filter"));

    session.navigation_mut().back();
    session.restore_from_navigation();
    assert_eq!(session.state().filter_alias(), Some("project"));
}

#[tokio::test]
async fn late_listener_still_sees_back_navigation() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.load_initial("?q=first").await.unwrap();
    session.set_query("second");
    session.submit().await.unwrap();
    session.set_query("third");
    session.submit().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.navigation_mut().on_change(tx);
    assert!(session.navigation_mut().back());
    rx.try_recv().unwrap();

    assert!(session.handle_navigation_change().await.unwrap());
    assert_eq!(session.state().query, "second");
    assert_eq!(session.backend().requests().len(), 4);
}

#[tokio::test]
async fn own_pushes_are_not_treated_as_navigation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut history = MemoryHistory::new();
    history.on_change(tx);
    let mut session = SearchSession::new(
        SessionOptions::default(),
        MockBackend::new(catalog(25, 20, 5)),
        history,
    );

    session.load_initial("?q=first").await.unwrap();
    session.set_query("second");
    session.submit().await.unwrap();
    assert_eq!(session.navigation().len(), 2);

    rx.try_recv().unwrap();
    assert!(!session.handle_navigation_change().await.unwrap());
    assert_eq!(session.backend().requests().len(), 2);

    assert!(session.navigation_mut().back());
    rx.try_recv().unwrap();
    assert!(session.handle_navigation_change().await.unwrap());
    assert_eq!(session.state().query, "first");
    assert_eq!(session.backend().requests().len(), 3);
    assert_eq!(query_text(&session.backend().requests()[2]), "first");
    assert_eq!(session.navigation().len(), 2);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn deep_link_with_empty_filter_falls_back() {
    let mut session = session_with(MockBackend::new(catalog(25, 25, 0)), 10);
    session
        .load_initial("?q=brian&filter=user&page=1")
        .await
        .unwrap();

    let requests = session.backend().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(query_text(&requests[0]), "brian AND category:user");
    assert_eq!(query_text(&requests[1]), "brian");
    assert!(session
        .state()
        .active_category
        .as_ref()
        .map(Category::is_total)
        .unwrap_or(false));
    assert_eq!(session.state().total_results, 25);
    assert_eq!(session.navigation().len(), 1);
}

#[tokio::test]
async fn deep_link_with_stale_page_is_clamped() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.load_initial("?q=x&page=9").await.unwrap();
    assert_eq!(session.backend().froms(), vec![80, 20]);
    assert_eq!(session.state().current_page, 3);
    assert_eq!(session.state().results.len(), 5);
}

#[tokio::test]
async fn validate_after_load_is_a_noop_when_consistent() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.load_initial("?q=x&filter=project&page=2").await.unwrap();
    assert_eq!(session.backend().requests().len(), 1);
    session.validate_after_load().await.unwrap();
    assert_eq!(session.backend().requests().len(), 1);
    assert_eq!(session.state().current_page, 2);
}

#[tokio::test]
async fn paging_past_the_end_settles_on_last_page() {
    let mut session = session_with(MockBackend::new(catalog(25, 20, 5)), 10);
    session.load_initial("?q=x&page=3").await.unwrap();
    session.next_page().await.unwrap();
    assert_eq!(session.backend().froms(), vec![20, 30, 20]);
    assert_eq!(session.state().current_page, 3);
    let current = session.navigation().state();
    assert_eq!(current.page, Some(3));
    assert_eq!(session.navigation().len(), 1);
}

#[tokio::test]
async fn claim_maps_status_to_message() {
    let mut session = session_with(MockBackend::new(catalog(1, 1, 0)), 10);
    let url = session.claim("abc12").await.unwrap();
    assert_eq!(url, "http://app/abc12/");
    assert_eq!(
        session.status().current().map(|m| m.severity),
        Some(Severity::Success)
    );

    let mut backend = MockBackend::new(catalog(1, 1, 0));
    backend.claim_status = Some(410);
    let mut session = session_with(backend, 10);
    assert!(session.claim("abc12").await.is_err());
    assert_eq!(
        session.status().current().map(|m| m.text.as_str()),
        Some(MessageKind::Deaccessioned.text())
    );
}
