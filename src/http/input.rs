//! The structured request handed to the dispatch engine.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method};
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use crate::routing::Params;

/// A query or form value: a single string, or a list for repeated keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The first (or only) value.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::One(value) => Some(value),
            QueryValue::Many(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::One(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Many(vec![first, value]);
            }
            QueryValue::Many(values) => values.push(value),
        }
    }
}

/// Parsed `application/x-www-form-urlencoded` key/value pairs.
///
/// Repeated keys collect into a list, as does any key written `key[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, QueryValue>);

impl Query {
    pub fn parse(raw: &str) -> Self {
        let mut query = Query::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let (key, forced_list) = match key.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (key.into_owned(), false),
            };
            let value = value.into_owned();

            match query.0.get_mut(&key) {
                Some(existing) => existing.push(value),
                None if forced_list => {
                    query.0.insert(key, QueryValue::Many(vec![value]));
                }
                None => {
                    query.0.insert(key, QueryValue::One(value));
                }
            }
        }
        query
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    /// First value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::first)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object view, used for form fields.
    pub fn into_json(self) -> Map<String, Value> {
        self.0
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    QueryValue::One(one) => Value::String(one),
                    QueryValue::Many(many) => Value::from(many),
                };
                (key, value)
            })
            .collect()
    }
}

/// A file attached to the request by a body parser.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The request as seen by handlers.
///
/// Handlers receive it by value and hand it on to `Next::run`, so anything a
/// handler changes (including `extensions`) is visible further down the chain.
#[derive(Debug, Clone, Default)]
pub struct Input {
    /// Request method.
    pub method: Method,

    /// Request path, query stripped.
    pub path: String,

    pub headers: HeaderMap,

    pub query: Query,

    /// Captures of the currently matched route. Replaced on every match.
    pub params: Params,

    pub cookies: BTreeMap<String, String>,

    /// Body fields, filled by the body parser.
    pub fields: Map<String, Value>,

    /// Uploaded files by field name, filled by the body parser.
    pub files: BTreeMap<String, Vec<UploadedFile>>,

    /// Typed state handlers pass down the chain.
    pub extensions: Extensions,
}

impl Input {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Header value as a string, if present and valid UTF-8 text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// JSON snapshot of the request (files reported by name and size).
    pub fn to_json(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), Value::String(value.to_string())))
            })
            .collect();

        let files: Map<String, Value> = self
            .files
            .iter()
            .map(|(field, uploads)| {
                let uploads: Vec<Value> = uploads
                    .iter()
                    .map(|file| {
                        json!({
                            "originalFilename": file.original_filename,
                            "mimetype": file.content_type,
                            "size": file.data.len(),
                        })
                    })
                    .collect();
                (field.clone(), Value::Array(uploads))
            })
            .collect();

        json!({
            "method": self.method.as_str(),
            "path": self.path,
            "headers": headers,
            "query": self.query,
            "params": self.params,
            "cookies": self.cookies,
            "fields": self.fields,
            "files": files,
        })
    }
}
