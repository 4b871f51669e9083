use std::collections::HashMap;

use serde_json::Value;

/// In-memory response memo keyed by request URL, bound to one API base URL.
///
/// Binding a different base URL drops every entry, so a session that switches
/// APIs never mixes tables from two servers.
#[derive(Debug, Default)]
pub struct DatasetCache {
    base_url: Option<String>,
    bodies: HashMap<String, Value>,
    hits: u64,
    misses: u64,
}

/// Base URLs compare without trailing slashes.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the cache to `base_url`. Returns true if entries were dropped
    /// because a different base URL was bound before.
    pub fn bind(&mut self, base_url: &str) -> bool {
        let base = normalize_base_url(base_url);
        match &self.base_url {
            Some(current) if *current == base => false,
            Some(_) => {
                let dropped = !self.bodies.is_empty();
                self.bodies.clear();
                self.base_url = Some(base);
                dropped
            }
            None => {
                self.base_url = Some(base);
                false
            }
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn get(&mut self, url: &str) -> Option<&Value> {
        match self.bodies.get(url) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, url: String, body: Value) {
        self.bodies.insert(url, body);
    }

    /// Drop all entries but keep the base URL binding.
    pub fn invalidate(&mut self) {
        self.bodies.clear();
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
