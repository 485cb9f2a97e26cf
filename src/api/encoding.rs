/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::DailymotionError;
use serde_json::{Map, Value};
use url::Url;

// Strings go through untouched, everything else is sent as its JSON text.
// Nulls are dropped.
pub(crate) fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

/// Builds `<base><path>`, inserting the separating slash when needed.
pub(crate) fn api_url(base: &Url, resource_path: &str) -> Result<Url, DailymotionError> {
    let base = base.as_str().trim_end_matches('/');
    let separator = if resource_path.starts_with('/') { "" } else { "/" };
    Ok(Url::parse(&format!("{base}{separator}{resource_path}"))?)
}

/// Appends filters and the comma joined `fields` projection to the query.
pub(crate) fn append_query(url: &mut Url, filters: &Map<String, Value>, fields: &[&str]) {
    let pairs: Vec<(&str, String)> = filters
        .iter()
        .filter_map(|(k, v)| param_value(v).map(|v| (k.as_str(), v)))
        .collect();
    if pairs.is_empty() && fields.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in &pairs {
        query.append_pair(key, value);
    }
    if !fields.is_empty() {
        query.append_pair("fields", &fields.join(","));
    }
}

/// `key=value&...` form body
pub(crate) fn encode_body(resource: &Map<String, Value>) -> String {
    resource
        .iter()
        .filter_map(|(k, v)| param_value(v).map(|v| (k, v)))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn encode_headers(headers: &Map<String, Value>) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(k, v)| param_value(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Value of a `page` filter, given as a number or as text. 0 when unreadable.
pub(crate) fn page_number(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// `path/id`, without doubling a trailing slash
pub(crate) fn join_id(path: &str, id: &str) -> String {
    if path.ends_with('/') {
        format!("{path}{id}")
    } else {
        format!("{path}/{id}")
    }
}
