use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{json, Value};

pub const TOTAL_CATEGORY: &str = "Total";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub raw_name: String,
    pub count: u64,
    pub alias: String,
}

impl Category {
    pub fn new(raw_name: &str, count: u64, alias: &str) -> Self {
        Self {
            name: display_case(raw_name),
            raw_name: raw_name.to_string(),
            count,
            alias: alias.to_string(),
        }
    }

    /// The aggregate pseudo-category; selecting it applies no filter.
    pub fn total(count: u64) -> Self {
        Self::new("total", count, "total")
    }

    /// Category rebuilt from a filter alias found in a navigation entry.
    /// Response counts are keyed by the plural raw name.
    pub fn from_filter_alias(alias: &str) -> Self {
        Self::new(&format!("{alias}s"), 0, alias)
    }

    pub fn is_total(&self) -> bool {
        self.name == TOTAL_CATEGORY || is_total_alias(&self.alias)
    }

    pub fn filter_alias(&self) -> Option<&str> {
        if self.is_total() || self.alias.trim().is_empty() {
            None
        } else {
            Some(self.alias.as_str())
        }
    }

    pub fn filter_clause(&self) -> String {
        match self.filter_alias() {
            Some(alias) => format!(" AND category:{alias}"),
            None => String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub count: u64,
}

/// A tag named either directly or through a facet entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRef(String);

impl TagRef {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TagRef {
    fn from(value: &str) -> Self {
        TagRef(value.to_string())
    }
}

impl From<String> for TagRef {
    fn from(value: String) -> Self {
        TagRef(value)
    }
}

impl From<&Tag> for TagRef {
    fn from(value: &Tag) -> Self {
        TagRef(value.name.clone())
    }
}

/// `total` names the aggregate pseudo-category, never a real filter.
pub fn is_total_alias(alias: &str) -> bool {
    alias.trim().eq_ignore_ascii_case("total")
}

fn display_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn append_tag(query: &str, tag: &TagRef) -> String {
    let clause = format!("tags:(\"{}\")", tag.name());
    if query.trim().is_empty() {
        clause
    } else {
        format!("{query} AND {clause}")
    }
}

pub fn composite_text(query: &str, category: Option<&Category>) -> String {
    let clause = category.map(Category::filter_clause).unwrap_or_default();
    format!("{query}{clause}")
}

/// Wraps the composite text as the filtered query_string body the search
/// engine expects.
pub fn build_full_query(text: &str) -> Value {
    json!({
        "filtered": {
            "query": {
                "query_string": {
                    "default_field": "_all",
                    "query": text,
                    "analyze_wildcard": true,
                    "lenient": true
                }
            }
        }
    })
}

/// Total first, then descending count, then alias so equal counts keep a
/// stable order across responses.
pub fn compare_categories(a: &Category, b: &Category) -> Ordering {
    match (a.is_total(), b.is_total()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    b.count
        .cmp(&a.count)
        .then_with(|| a.alias.cmp(&b.alias))
}

pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(compare_categories);
}

/// Relative weight 1..=5 of a tag against the largest tag count on the page.
pub fn tag_weight(count: u64, max_count: u64) -> u8 {
    let max = max_count.max(1);
    let scaled = (count.min(max) * 4 + max / 2) / max;
    (scaled as u8) + 1
}
