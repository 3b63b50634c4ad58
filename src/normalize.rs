// src/normalize.rs
//! Response normalizer: turns raw model text (or a proxy envelope) into an ordered
//! news batch with batch-unique ids and attached citations.

use std::collections::{HashMap, HashSet};

use metrics::counter;
use serde_json::Value;
use tracing::warn;

use crate::error::{excerpt, FetchError};
use crate::news::{NewsItem, SourceCitation};
use crate::telemetry::anon_hash;

/// How grounding citations are spread over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationPolicy {
    /// Every item gets the full citation list.
    Shared,
    /// Item `i` gets `citations[i*size .. i*size+size]`, clipped.
    Windowed { size: usize },
}

impl Default for CitationPolicy {
    fn default() -> Self {
        CitationPolicy::Windowed { size: 2 }
    }
}

impl CitationPolicy {
    pub fn slice_for<'a>(&self, pos: usize, all: &'a [SourceCitation]) -> &'a [SourceCitation] {
        match *self {
            CitationPolicy::Shared => all,
            CitationPolicy::Windowed { size } => {
                let start = pos.saturating_mul(size).min(all.len());
                let end = start.saturating_add(size).min(all.len());
                &all[start..end]
            }
        }
    }
}

/// Locate the JSON payload inside `raw`: the whole text when it already is JSON,
/// otherwise the span from the first `{` to the last `}`.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let t = raw.trim();
    if t.starts_with('{') && t.ends_with('}') {
        return Some(t);
    }
    let start = t.find('{')?;
    let end = t.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&t[start..=end])
}

/// Raw upstream text → items. Fails only when no JSON object can be extracted or
/// the `news` value has the wrong shape.
pub fn normalize_text(
    raw: &str,
    citations: &[SourceCitation],
    policy: CitationPolicy,
) -> Result<Vec<NewsItem>, FetchError> {
    let Some(span) = extract_json_span(raw) else {
        log_parse_failure("no json object span", raw);
        return Err(FetchError::parse("no JSON object found in model output", raw));
    };
    let value: Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            log_parse_failure("json syntax", raw);
            return Err(FetchError::parse(format!("invalid JSON: {e}"), raw));
        }
    };
    normalize_value(value, citations, policy)
        .inspect_err(|_| log_parse_failure("payload shape", raw))
}

/// Parsed payload → items.
pub fn normalize_value(
    value: Value,
    citations: &[SourceCitation],
    policy: CitationPolicy,
) -> Result<Vec<NewsItem>, FetchError> {
    let Value::Object(mut obj) = value else {
        return Err(FetchError::parse("top-level JSON is not an object", ""));
    };
    let items: Vec<NewsItem> = match obj.remove("news") {
        None | Some(Value::Null) => Vec::new(),
        Some(v @ Value::Array(_)) => serde_json::from_value(v)
            .map_err(|e| FetchError::parse(format!("news item has wrong shape: {e}"), ""))?,
        Some(_) => return Err(FetchError::parse("`news` is not a list", "")),
    };
    Ok(enrich(items, citations, policy, batch_stamp()))
}

/// Assign ids and citations. `stamp` is the batch creation time in unix millis.
pub fn enrich(
    items: Vec<NewsItem>,
    citations: &[SourceCitation],
    policy: CitationPolicy,
    stamp: i64,
) -> Vec<NewsItem> {
    // An incoming id survives only if no other item in the batch carries it.
    let mut seen: HashMap<String, usize> = HashMap::new();
    for item in &items {
        let id = item.id.trim();
        if !id.is_empty() {
            *seen.entry(id.to_string()).or_default() += 1;
        }
    }
    let mut taken: HashSet<String> = seen
        .iter()
        .filter(|(_, n)| **n == 1)
        .map(|(id, _)| id.clone())
        .collect();

    let out: Vec<NewsItem> = items
        .into_iter()
        .enumerate()
        .map(|(pos, mut item)| {
            let kept = item.id.trim().to_string();
            if seen.get(&kept) == Some(&1) {
                item.id = kept;
            } else {
                item.id = fresh_id(stamp, pos, &mut taken);
            }
            if !citations.is_empty() {
                item.source_urls = policy.slice_for(pos, citations).to_vec();
            }
            item
        })
        .collect();
    counter!("news_items_total").increment(out.len() as u64);
    out
}

fn fresh_id(stamp: i64, pos: usize, taken: &mut HashSet<String>) -> String {
    let mut id = format!("news-{stamp}-{pos}");
    let mut n = 1;
    while taken.contains(&id) {
        id = format!("news-{stamp}-{pos}-{n}");
        n += 1;
    }
    taken.insert(id.clone());
    id
}

fn batch_stamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn log_parse_failure(stage: &'static str, raw: &str) {
    // Raw text stays out of user-facing errors; logs get a fingerprint and a short excerpt.
    warn!(
        target: "normalize",
        stage,
        raw_id = %anon_hash(raw),
        raw_len = raw.len(),
        excerpt = %excerpt(raw, 120),
        "could not normalize upstream text"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cites(n: usize) -> Vec<SourceCitation> {
        (0..n)
            .map(|i| SourceCitation {
                title: format!("t{i}"),
                uri: format!("https://example.test/{i}"),
            })
            .collect()
    }

    #[test]
    fn span_handles_fences_and_prose() {
        assert_eq!(extract_json_span("{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(
            extract_json_span("```json\n{\"a\":{\"b\":2}}\n```"),
            Some("{\"a\":{\"b\":2}}")
        );
        assert_eq!(extract_json_span("Here you go: {\"x\":1} thanks"), Some("{\"x\":1}"));
        assert_eq!(extract_json_span("no json here"), None);
        assert_eq!(extract_json_span("} backwards {"), None);
    }

    #[test]
    fn windowed_slices_are_clipped() {
        let all = cites(5);
        let p = CitationPolicy::Windowed { size: 2 };
        assert_eq!(p.slice_for(0, &all).len(), 2);
        assert_eq!(p.slice_for(1, &all)[0].title, "t2");
        assert_eq!(p.slice_for(2, &all).len(), 1);
        assert!(p.slice_for(3, &all).is_empty());
        assert_eq!(CitationPolicy::Shared.slice_for(7, &all).len(), 5);
    }

    #[test]
    fn enrich_keeps_existing_ids_and_fills_missing() {
        let items = vec![
            NewsItem {
                id: "keep-me".into(),
                ..Default::default()
            },
            NewsItem::default(),
        ];
        let out = enrich(items, &[], CitationPolicy::default(), 42);
        assert_eq!(out[0].id, "keep-me");
        assert_eq!(out[1].id, "news-42-1");
    }

    #[test]
    fn repeated_ids_are_replaced_with_fresh_ones() {
        let with_id = |id: &str| NewsItem {
            id: id.into(),
            ..Default::default()
        };
        let items = vec![with_id("1"), with_id("1"), with_id("news-42-3"), with_id("")];
        let out = enrich(items, &[], CitationPolicy::default(), 42);
        let ids: Vec<&str> = out.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids[0], "news-42-0");
        assert_eq!(ids[1], "news-42-1");
        assert_eq!(ids[2], "news-42-3");
        assert_eq!(ids[3], "news-42-3-1");
    }

    #[test]
    fn citations_replace_item_sources_only_when_present() {
        let mut item = NewsItem::default();
        item.source_urls = cites(1);
        let kept = enrich(vec![item.clone()], &[], CitationPolicy::Shared, 1);
        assert_eq!(kept[0].source_urls, cites(1));
        let replaced = enrich(vec![item], &cites(3), CitationPolicy::Shared, 1);
        assert_eq!(replaced[0].source_urls.len(), 3);
    }

    #[test]
    fn wrong_shapes_are_parse_errors() {
        let policy = CitationPolicy::default();
        assert!(normalize_text("[1,2]", &[], policy).is_err());
        assert!(normalize_text(r#"{"news": 5}"#, &[], policy).is_err());
        assert!(normalize_text(r#"{"news": [1]}"#, &[], policy).is_err());
        assert!(normalize_text(r#"{"news": null}"#, &[], policy).unwrap().is_empty());
    }
}
