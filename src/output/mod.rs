use serde::Serialize;
use serde_json::Value;

use crate::query::{self, Category, Tag};
use crate::session::{SearchState, SearchView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub count: u64,
    pub weight: u8,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageRecord {
    pub query: String,
    pub filter: Option<String>,
    pub page: u32,
    pub total_pages: u64,
    pub total_results: u64,
    pub categories: Vec<Category>,
    pub tags: Vec<TagRecord>,
    pub results: Vec<Value>,
}

pub fn build_record(state: &SearchState, view: &SearchView) -> PageRecord {
    PageRecord {
        query: state.query.clone(),
        filter: state.filter_alias().map(str::to_string),
        page: state.current_page,
        total_pages: view.total_pages,
        total_results: state.total_results,
        categories: state.categories.clone(),
        tags: state
            .tags
            .iter()
            .map(|t: &Tag| TagRecord {
                name: t.name.clone(),
                count: t.count,
                weight: query::tag_weight(t.count, state.tag_max_count),
            })
            .collect(),
        results: state.results.clone(),
    }
}

/// One-line label for an opaque result record.
pub fn result_label(result: &Value) -> String {
    for key in ["title", "name", "url"] {
        if let Some(text) = result.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }
    }
    result.to_string()
}

pub fn render_text(record: &PageRecord) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!(
        ":: Page {} of {} :: {} results\n",
        record.page, record.total_pages, record.total_results
    ));
    if !record.categories.is_empty() {
        let cats = record
            .categories
            .iter()
            .map(|c| {
                let marker = if record.filter.as_deref() == c.filter_alias()
                    && (record.filter.is_some() || c.is_total())
                {
                    "*"
                } else {
                    ""
                };
                format!("{marker}{} ({})", c.name, c.count)
            })
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(&format!(":: Categories: {cats}\n"));
    }
    if !record.tags.is_empty() {
        let tags = record
            .tags
            .iter()
            .map(|t| format!("{}[{}]", t.name, t.weight))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(":: Tags      : {tags}\n"));
    }
    for (i, r) in record.results.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", i + 1, result_label(r)));
    }
    out.into_bytes()
}

pub fn render_json(record: &PageRecord) -> Vec<u8> {
    serde_json::to_vec_pretty(record).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(record: &PageRecord, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(record),
        OutputFormat::Json => render_json(record),
    }
}
