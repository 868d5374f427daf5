//! Per-route options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flags and metadata attached to a route at registration.
///
/// Fields left unset do not override anything when options are merged, so a
/// mount call can overlay its options on a sub-router's routes without
/// erasing what those routes already carry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Answer `OPTIONS` preflights and add permissive CORS headers.
    pub cors: Option<bool>,

    /// Free-form metadata: every key other than `cors`.
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with CORS turned on.
    pub fn cors() -> Self {
        Self {
            cors: Some(true),
            ..Self::default()
        }
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = Some(enabled);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn cors_enabled(&self) -> bool {
        self.cors.unwrap_or(false)
    }

    /// Merge `other` into `self`; whatever `other` sets wins.
    pub fn merge(&mut self, other: &RouteOptions) {
        if other.cors.is_some() {
            self.cors = other.cors;
        }
        for (key, value) in &other.meta {
            self.meta.insert(key.clone(), value.clone());
        }
    }

    /// Copy of `self` with `overlay` merged on top.
    pub fn overlaid(&self, overlay: &RouteOptions) -> RouteOptions {
        let mut merged = self.clone();
        merged.merge(overlay);
        merged
    }
}
