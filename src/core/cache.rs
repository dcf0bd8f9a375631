//! Bounded translation cache with FIFO eviction

use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

use crate::core::models::{TranslationRequest, TranslationResult};

/// Number of entries kept before the oldest is evicted
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Composite key `text|source|target|tone`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(text: &str, source_lang: &str, target_lang: &str, tone: &str) -> Self {
        Self(format!("{}|{}|{}|{}", text, source_lang, target_lang, tone))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&TranslationRequest> for CacheKey {
    fn from(request: &TranslationRequest) -> Self {
        Self::new(
            &request.text,
            &request.source_lang,
            &request.target_lang,
            request.tone.as_str(),
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Successful results keyed by request, oldest insertion evicted first
#[derive(Debug)]
pub struct TranslationCache {
    capacity: usize,
    entries: HashMap<CacheKey, TranslationResult>,
    order: VecDeque<CacheKey>,
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&TranslationResult> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a successful result. Failures are never cached.
    ///
    /// Returns `false` if the result was rejected.
    pub fn insert(&mut self, key: CacheKey, result: TranslationResult) -> bool {
        if !result.is_success() {
            return false;
        }

        if let Some(existing) = self.entries.get_mut(&key) {
            // keeps its original insertion slot
            *existing = result;
            return true;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    debug!("Evicting cache entry: {}", oldest);
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, result);
        true
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("Clearing {} cached translations", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
