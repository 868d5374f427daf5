//! Verb tokens and method sets.
//!
//! # Design Decisions
//! - One fixed verb list; registration sugar is generated from it
//! - An empty `MethodSet` means "any verb" (the `mount` registration)
//! - `Verb::All` also means "any verb" but keeps exact path matching

use std::fmt;

use axum::http::Method;
use serde::Serialize;

/// A verb token a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    /// Explicit wildcard token.
    All,
}

impl Verb {
    /// Every verb, in registration-sugar order.
    pub const ALL: [Verb; 10] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Put,
        Verb::Delete,
        Verb::Connect,
        Verb::Options,
        Verb::Trace,
        Verb::Patch,
        Verb::All,
    ];

    /// Lowercase token, as used in route listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Head => "head",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Delete => "delete",
            Verb::Connect => "connect",
            Verb::Options => "options",
            Verb::Trace => "trace",
            Verb::Patch => "patch",
            Verb::All => "all",
        }
    }

    /// Returns true if a request carrying `method` satisfies this token.
    pub fn accepts(&self, method: &Method) -> bool {
        matches!(self, Verb::All) || self.as_str().eq_ignore_ascii_case(method.as_str())
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free set of verbs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MethodSet(Vec<Verb>);

impl MethodSet {
    /// The empty set (matches every verb).
    pub fn any() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.0.contains(&verb)
    }

    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        self.0.iter().copied()
    }

    pub fn insert(&mut self, verb: Verb) {
        if !self.contains(verb) {
            self.0.push(verb);
        }
    }

    /// Set union, keeping `self`'s order and appending what `other` adds.
    pub fn union(&self, other: &MethodSet) -> MethodSet {
        let mut merged = self.clone();
        for verb in other.iter() {
            merged.insert(verb);
        }
        merged
    }

    /// Method filter used during dispatch.
    pub fn allows(&self, method: &Method) -> bool {
        self.is_empty() || self.0.iter().any(|verb| verb.accepts(method))
    }
}

impl From<Verb> for MethodSet {
    fn from(verb: Verb) -> Self {
        Self(vec![verb])
    }
}

impl FromIterator<Verb> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Verb>>(iter: I) -> Self {
        let mut set = MethodSet::any();
        for verb in iter {
            set.insert(verb);
        }
        set
    }
}
