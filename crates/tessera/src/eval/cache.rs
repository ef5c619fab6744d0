//! Per-pass memo of resolved parameter values.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use log::debug;
use uuid::Uuid;

/// Cache key of one resolved parameter.
///
/// Keys are equal when the parameters are equal and either both paths are
/// empty, or paths and top-level data sets are equal too. A parameter
/// reached through different reference hops is cached separately.
#[derive(Debug, Clone)]
pub struct CachedParameterKey {
    parameter: Uuid,
    path: Vec<Uuid>,
    top_dataset: Uuid,
}

impl CachedParameterKey {
    pub fn new(parameter: Uuid, path: Vec<Uuid>, top_dataset: Uuid) -> Self {
        Self {
            parameter,
            path,
            top_dataset,
        }
    }

    pub fn parameter(&self) -> Uuid {
        self.parameter
    }

    pub fn path(&self) -> &[Uuid] {
        &self.path
    }

    pub fn top_dataset(&self) -> Uuid {
        self.top_dataset
    }
}

impl PartialEq for CachedParameterKey {
    fn eq(&self, other: &Self) -> bool {
        if self.parameter != other.parameter {
            return false;
        }
        if self.path.is_empty() && other.path.is_empty() {
            return true;
        }
        self.path == other.path && self.top_dataset == other.top_dataset
    }
}

impl Eq for CachedParameterKey {}

impl Hash for CachedParameterKey {
    // Must agree with `eq`, which may ignore path and top data set
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parameter.hash(state);
    }
}

/// Insert-only value cache owned by a single evaluation pass.
#[derive(Debug, Default)]
pub struct MacroCache {
    entries: HashMap<CachedParameterKey, String>,
    hits: usize,
    misses: usize,
}

impl MacroCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value, counting the hit or miss.
    pub fn get(&mut self, key: &CachedParameterKey) -> Option<&str> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                debug!(parameter:? = key.parameter, path_len = key.path.len(); "Cache hit");
                Some(value)
            }
            None => {
                self.misses += 1;
                debug!(parameter:? = key.parameter, path_len = key.path.len(); "Cache miss");
                None
            }
        }
    }

    /// Store a value. An existing entry is kept unchanged.
    pub fn insert(&mut self, key: CachedParameterKey, value: String) -> &str {
        self.entries.entry(key).or_insert(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
