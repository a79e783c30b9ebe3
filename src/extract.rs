use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

// Listview payloads are embedded in the page JS as a single line:
// `new Listview({..., data: [{...},{...}]});`. The match runs from the
// `data: [` marker to the statement's closing `;`.
static DATA_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"data: \[.*;").unwrap());
static DEC_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d{1,6});").unwrap());

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no listview data block found in page")]
    NotFound,
    #[error("listview data is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
}

/// One extracted entity: a key plus field values in declared-column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub values: Vec<String>,
}

/// Pull every listview data block out of the raw page text and flatten the
/// decoded objects into Records, in document order. `name`/`tag` absent or
/// null decode to the empty string; an object without an `id` is skipped.
pub fn extract(page: &str) -> Result<Vec<Record>, ExtractError> {
    let mut records = Vec::new();
    let mut found = false;

    for m in DATA_BLOCK_RE.find_iter(page) {
        found = true;
        let text = m
            .as_str()
            .trim_start_matches("data: ")
            .replace("});", "");
        let text = text.trim_end_matches(';');

        let objects: Vec<Value> = serde_json::from_str(text)?;
        for obj in &objects {
            let Some(id) = obj.get("id") else {
                warn!("listview object without id, skipping: {obj}");
                continue;
            };
            records.push(Record {
                key: scalar_to_string(id),
                values: vec![
                    normalize_entities(&text_field(obj, "name")),
                    normalize_entities(&text_field(obj, "tag")),
                ],
            });
        }
    }

    if !found {
        return Err(ExtractError::NotFound);
    }
    Ok(records)
}

/// Named field lookup with an explicit empty-string default. Absence of a
/// text field is normal page variation, not an error.
fn text_field(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        Some(v) if !v.is_null() => scalar_to_string(v),
        _ => String::new(),
    }
}

// serde_json formats numbers locale-invariantly, which keeps the rendered
// statements byte-stable regardless of host locale.
fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode the HTML entities wowhead leaves in display text. Named subset
/// seen in practice plus decimal numeric references; `&amp;` goes last so
/// double-escaped text is not decoded twice.
pub fn normalize_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let s = s
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    let s = DEC_ENTITY_RE.replace_all(&s, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    s.replace("&amp;", "&")
}
