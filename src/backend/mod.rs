use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("claim requires an application URL")]
    MissingAppUrl,
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: Value,
    pub from: u64,
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TagBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub counts: HashMap<String, Option<u64>>,
    #[serde(rename = "typeAliases", default)]
    pub type_aliases: HashMap<String, String>,
    #[serde(default)]
    pub tags: Vec<TagBucket>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClaimResponse {
    pub url: String,
}

/// The remote service a search session talks to.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;

    async fn claim(&self, id: &str) -> Result<ClaimResponse, BackendError>;
}

#[derive(Clone, Debug)]
pub struct HttpOptions {
    pub query_url: String,
    pub app_url: Option<String>,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub header: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            query_url: "http://localhost:5000/api/v1/search/".to_string(),
            app_url: None,
            timeout_seconds: 10,
            proxy: None,
            header: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    query_url: String,
    app_url: Option<String>,
}

impl HttpBackend {
    pub fn new(options: &HttpOptions) -> Result<Self, BackendError> {
        let client = build_client(
            options.proxy.as_deref(),
            options.header.as_deref(),
            options.timeout_seconds,
        )?;
        Ok(Self {
            client,
            query_url: options.query_url.clone(),
            app_url: options.app_url.clone(),
        })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, BackendError> {
        debug!(url, "POST");
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request {
                url: url.to_string(),
                source: e,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json::<T>().await.map_err(|e| BackendError::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.post_json(&self.query_url, request).await
    }

    async fn claim(&self, id: &str) -> Result<ClaimResponse, BackendError> {
        let app_url = self.app_url.as_deref().ok_or(BackendError::MissingAppUrl)?;
        let url = claim_url(app_url, id);
        self.post_json(&url, &json!({ "category": "project" })).await
    }
}

pub fn claim_url(app_url: &str, id: &str) -> String {
    let base = if app_url.ends_with('/') {
        app_url.to_string()
    } else {
        format!("{app_url}/")
    };
    format!("{base}metadata/{}/promote/", id.trim())
}

pub fn parse_header(raw: &str) -> Result<(String, String), BackendError> {
    let invalid = || BackendError::InvalidHeader {
        header: raw.to_string(),
    };
    let (key, value) = raw.split_once(':').ok_or_else(invalid)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid());
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn build_client(
    proxy: Option<&str>,
    header: Option<&str>,
    timeout_seconds: usize,
) -> Result<reqwest::Client, BackendError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!(
            "facetsearch/",
            env!("CARGO_PKG_VERSION")
        )),
    );
    if let Some(raw) = header.filter(|h| !h.trim().is_empty()) {
        let (key, value) = parse_header(raw)?;
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            BackendError::InvalidHeader {
                header: raw.to_string(),
            }
        })?;
        let value = reqwest::header::HeaderValue::from_str(&value).map_err(|_| {
            BackendError::InvalidHeader {
                header: raw.to_string(),
            }
        })?;
        headers.insert(name, value);
    }

    let timeout = Duration::from_secs(timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout);

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| BackendError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| BackendError::HttpClientBuild { source: e })
}
