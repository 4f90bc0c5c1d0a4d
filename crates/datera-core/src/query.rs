//! Convenience builder for HTTP query parameters.
//!
//! The Datera API only expects parameters that carry a value: empty strings
//! and zero counts are never sent.

use std::collections::BTreeMap;
use std::fmt::Display;

/// Query parameters, keyed by name.
pub type QueryMap = BTreeMap<String, String>;

/// Builder for assembling query parameter maps.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: QueryMap,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pairs: QueryMap::new(),
        }
    }

    /// Insert a string value unless it is empty.
    pub fn push_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.pairs.insert(key.to_string(), value.to_string());
        }
    }

    /// Insert a numeric value unless it is zero.
    pub fn push_non_zero(&mut self, key: &str, value: u64) {
        if value != 0 {
            self.pairs.insert(key.to_string(), value.to_string());
        }
    }

    /// Insert a required key/value pair.
    pub fn push<T>(&mut self, key: &str, value: T)
    where
        T: Display,
    {
        self.pairs.insert(key.to_string(), value.to_string());
    }

    /// Return the collected parameters.
    #[must_use]
    pub fn into_map(self) -> QueryMap {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
