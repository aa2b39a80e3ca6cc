//! Remote request and response types.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::error::{RemoteError, Result};
use crate::options::RawOptions;

/// Sequence token bound to a search request when it is issued.
///
/// Tokens increase monotonically per controller. A response is only applied
/// if its token is still the one the controller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub(crate) u64);

impl RequestToken {
    /// The raw sequence number.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A search (or pagination) request against the options endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// Sequence token bound at issue time.
    pub token: RequestToken,
    /// The endpoint URL (absolute or root-relative).
    pub endpoint: String,
    /// The search string; empty loads the default set.
    pub query: String,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub per_page: u32,
    /// Whether the response replaces the remote table or appends to it.
    pub replace: bool,
    /// Query parameter name for the search string.
    pub search_param: String,
    /// Query parameter name for the page number.
    pub page_param: String,
    /// Query parameter name for the page size, if sent.
    pub per_page_param: Option<String>,
    /// Static parameters sent with every request.
    pub extra_params: IndexMap<String, String>,
}

impl RemoteRequest {
    /// Query parameters in send order.
    ///
    /// Extra parameters come first and never override the search, page or
    /// page-size parameters. The search parameter is omitted for an empty query.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let reserved = [
            Some(self.search_param.as_str()),
            Some(self.page_param.as_str()),
            self.per_page_param.as_deref(),
        ];
        let mut pairs: Vec<(String, String)> = self
            .extra_params
            .iter()
            .filter(|(key, _)| !reserved.contains(&Some(key.as_str())))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if !self.query.is_empty() {
            pairs.push((self.search_param.clone(), self.query.clone()));
        }
        pairs.push((self.page_param.clone(), self.page.to_string()));
        if let Some(param) = &self.per_page_param {
            pairs.push((param.clone(), self.per_page.to_string()));
        }
        pairs
    }
}

/// A request for the full records of already selected values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRequest {
    /// The hydration endpoint URL.
    pub endpoint: String,
    /// Selected values missing from the option cache.
    pub values: Vec<String>,
    /// Query parameter name for the values (sent as `name[]`).
    pub selected_param: String,
    /// Static parameters sent with every request.
    pub extra_params: IndexMap<String, String>,
}

impl SelectedRequest {
    /// Query parameters in send order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let array_param = format!("{}[]", self.selected_param);
        self.extra_params
            .iter()
            .filter(|(key, _)| **key != self.selected_param && **key != array_param)
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(self.values.iter().map(|v| (array_param.clone(), v.clone())))
            .collect()
    }
}

/// One page of raw option records returned by a remote source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemotePage {
    /// Raw records, normalized by the option store on ingest.
    pub records: RawOptions,
    /// Whether another page can be requested.
    pub has_more: bool,
}

impl RemotePage {
    /// Create a page from raw records.
    pub fn new(records: Vec<Value>, has_more: bool) -> Self {
        Self {
            records: RawOptions::List(records),
            has_more,
        }
    }

    /// Parse a response payload.
    ///
    /// Records come from a top-level array or a `data` array. The pagination
    /// flag comes from, in order: an explicit `has_more`/`hasMore` flag, a
    /// `next_page_url`, `current_page`/`last_page` (top level or under `meta`),
    /// and finally whether a full page of `per_page` records came back.
    pub fn from_payload(payload: Value, per_page: u32) -> Result<Self> {
        let (records, envelope) = match payload {
            Value::Array(records) => (records, None),
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(records)) => (records, Some(map)),
                Some(other) => {
                    return Err(RemoteError::InvalidResponse(format!(
                        "expected `data` to be a list, got {}",
                        json_kind(&other)
                    )))
                }
                None => {
                    return Err(RemoteError::InvalidResponse(
                        "response has no `data` list".to_string(),
                    ))
                }
            },
            other => {
                return Err(RemoteError::InvalidResponse(format!(
                    "expected a list or an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let explicit = envelope.as_ref().and_then(|map| {
            explicit_flag(map)
                .or_else(|| map.get("next_page_url").map(|url| !url.is_null()))
                .or_else(|| page_bounds(map))
                .or_else(|| match map.get("meta") {
                    Some(Value::Object(meta)) => explicit_flag(meta).or_else(|| page_bounds(meta)),
                    _ => None,
                })
        });

        let has_more =
            explicit.unwrap_or(per_page > 0 && records.len() >= per_page as usize);

        Ok(Self::new(records, has_more))
    }

    /// Number of raw records on this page.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the page has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn explicit_flag(map: &serde_json::Map<String, Value>) -> Option<bool> {
    map.get("has_more")
        .or_else(|| map.get("hasMore"))
        .and_then(Value::as_bool)
}

fn page_bounds(map: &serde_json::Map<String, Value>) -> Option<bool> {
    let current = map.get("current_page").and_then(Value::as_u64)?;
    let last = map.get("last_page").and_then(Value::as_u64)?;
    Some(current < last)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(query: &str) -> RemoteRequest {
        RemoteRequest {
            token: RequestToken(1),
            endpoint: "/api/users".to_string(),
            query: query.to_string(),
            page: 1,
            per_page: 20,
            replace: true,
            search_param: "search".to_string(),
            page_param: "page".to_string(),
            per_page_param: Some("per_page".to_string()),
            extra_params: IndexMap::new(),
        }
    }

    #[test]
    fn test_query_pairs_with_search() {
        let pairs = request("abc").query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "abc".to_string()),
                ("page".to_string(), "1".to_string()),
                ("per_page".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_omit_empty_search() {
        let pairs = request("").query_pairs();
        assert!(pairs.iter().all(|(k, _)| k != "search"));
    }

    #[test]
    fn test_query_pairs_extra_params_cannot_override() {
        let mut req = request("abc");
        req.extra_params.insert("role".to_string(), "admin".to_string());
        req.extra_params.insert("page".to_string(), "99".to_string());
        let pairs = req.query_pairs();
        assert_eq!(pairs[0], ("role".to_string(), "admin".to_string()));
        let pages: Vec<_> = pairs.iter().filter(|(k, _)| k == "page").collect();
        assert_eq!(pages, vec![&("page".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_selected_query_pairs() {
        let mut extra = IndexMap::new();
        extra.insert("team".to_string(), "7".to_string());
        let req = SelectedRequest {
            endpoint: "/api/users/selected".to_string(),
            values: vec!["1".to_string(), "2".to_string()],
            selected_param: "selected".to_string(),
            extra_params: extra,
        };
        assert_eq!(
            req.query_pairs(),
            vec![
                ("team".to_string(), "7".to_string()),
                ("selected[]".to_string(), "1".to_string()),
                ("selected[]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_payload_top_level_array() {
        let page = RemotePage::from_payload(json!([{"id": 1, "name": "A"}]), 20).unwrap();
        assert_eq!(page.len(), 1);
        assert!(!page.has_more);
    }

    #[test]
    fn test_payload_full_page_implies_more() {
        let records: Vec<_> = (0..2).map(|i| json!({"id": i, "name": "x"})).collect();
        let page = RemotePage::from_payload(json!({"data": records}), 2).unwrap();
        assert!(page.has_more);
    }

    #[test]
    fn test_payload_explicit_flag_wins() {
        let page =
            RemotePage::from_payload(json!({"data": [], "has_more": true}), 20).unwrap();
        assert!(page.has_more);
        let page = RemotePage::from_payload(json!({"data": [], "hasMore": false}), 0).unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_payload_laravel_paginator() {
        let page = RemotePage::from_payload(
            json!({"data": [{"id": 1, "name": "A"}], "next_page_url": "https://x/api?page=2"}),
            20,
        )
        .unwrap();
        assert!(page.has_more);

        let page = RemotePage::from_payload(
            json!({"data": [], "next_page_url": null}),
            20,
        )
        .unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_payload_meta_pages() {
        let page = RemotePage::from_payload(
            json!({"data": [], "meta": {"current_page": 1, "last_page": 3}}),
            20,
        )
        .unwrap();
        assert!(page.has_more);

        let page = RemotePage::from_payload(
            json!({"data": [], "current_page": 3, "last_page": 3}),
            20,
        )
        .unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_payload_rejects_unknown_shapes() {
        assert!(matches!(
            RemotePage::from_payload(json!({"items": []}), 20),
            Err(RemoteError::InvalidResponse(_))
        ));
        assert!(matches!(
            RemotePage::from_payload(json!({"data": "nope"}), 20),
            Err(RemoteError::InvalidResponse(_))
        ));
        assert!(matches!(
            RemotePage::from_payload(json!("text"), 20),
            Err(RemoteError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_token_ordering_and_display() {
        assert!(RequestToken(1) < RequestToken(2));
        assert_eq!(RequestToken(7).to_string(), "#7");
        assert_eq!(RequestToken(7).value(), 7);
    }
}
