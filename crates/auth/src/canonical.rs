//! Canonical request strings for REST signatures.
//!
//! The string to sign is built from three lines joined by `\n`:
//!
//! * the upper-cased request method (e.g. `POST`)
//! * the request path as received (e.g. `/apps/1/events`)
//! * the query parameters, keys lower-cased and sorted, joined as
//!   `key=value` pairs with `&`. Values are used decoded and are
//!   not escaped again (`Name: Something else` becomes `name=Something else`).
//!
//! `auth_signature` is removed by the caller before canonicalization.

use std::collections::HashSet;

use url::form_urlencoded;

pub const SIGNATURE_PARAM: &str = "auth_signature";
pub const KEY_PARAM: &str = "auth_key";
pub const TIMESTAMP_PARAM: &str = "auth_timestamp";

/// Decoded query parameters in request order. Repeated keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value for `key` (exact spelling).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Remove every occurrence of `key`, returning the first value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_string);
        self.pairs.retain(|(k, _)| k != key);
        first
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Re-encode as a query string, preserving order.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The sorted `key=value&...` segment of the canonical string.
///
/// A key repeated with the same spelling contributes only its first value.
/// Keys that differ only by case stay separate; ties after lower-casing are
/// ordered by value so the output never depends on parameter order.
pub fn canonical_query(params: &QueryParams) -> String {
    let mut seen = HashSet::new();
    let mut pieces: Vec<(String, &str)> = params
        .pairs
        .iter()
        .filter(|(k, _)| seen.insert(k.as_str()))
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();
    pieces.sort_unstable();

    pieces
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Full string to sign: `METHOD\npath\nquery`.
pub fn canonical_string(method: &str, path: &str, params: &QueryParams) -> String {
    format!(
        "{}\n{}\n{}",
        method.to_uppercase(),
        path,
        canonical_query(params)
    )
}
