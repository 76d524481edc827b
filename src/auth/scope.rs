// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route-to-scope policy.
//!
//! Rules are supplied through configuration as `path_prefix=scope` pairs.
//! The most specific (longest) matching prefix decides which scope a request
//! needs. A path no rule matches needs no particular scope.

use std::cmp::Reverse;

/// A single `path_prefix=scope` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    prefix: String,
    scope: String,
}

impl ScopeRule {
    pub fn new(prefix: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            scope: scope.into(),
        }
    }

    /// Prefix without trailing slashes; `/investments/` and `/investments`
    /// are the same rule.
    fn normalized_prefix(&self) -> &str {
        self.prefix.trim_end_matches('/')
    }

    /// Segment-aware prefix match: `/investments` matches `/investments` and
    /// `/investments/companies` but not `/investmentsx`.
    fn matches(&self, path: &str) -> bool {
        let prefix = self.normalized_prefix();
        if prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopePolicy {
    rules: Vec<ScopeRule>,
}

impl ScopePolicy {
    pub fn new(mut rules: Vec<ScopeRule>) -> Self {
        rules.sort_by_key(|rule| Reverse(rule.normalized_prefix().len()));
        Self { rules }
    }

    /// Scope required for `path`, if any.
    pub fn required_scope(&self, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.scope.as_str())
    }
}
