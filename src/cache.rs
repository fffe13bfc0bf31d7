// src/cache.rs
// Shared key-value cache injected into every tool invocation

use std::any::Any;
use std::sync::Arc;

/// Values are opaque to the cache. The convention is store-replace: a value
/// retrieved from the cache must never be mutated in place.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

const DEFAULT_CAPACITY: u64 = 10_000;

/// Process-wide concurrent cache shared by all tools.
///
/// Keys are namespaced strings (e.g. `codeskim:{path}:{mtime}:{lang}`).
/// Typed access goes through [`ToolCache::get`], which downcasts to the
/// caller's type; a namespace must always store a single concrete type.
pub struct ToolCache {
    inner: moka::sync::Cache<String, CacheValue>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self {
            inner: moka::sync::Cache::builder()
                .max_capacity(DEFAULT_CAPACITY)
                .build(),
        }
    }

    /// Typed lookup. Returns None on a miss or a type mismatch.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner.get(key).and_then(|v| v.downcast::<T>().ok())
    }

    /// Insert a value, replacing any previous entry under the key.
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.inner.insert(key.into(), Arc::new(value));
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        for (key, _) in self.inner.iter() {
            if key.starts_with(prefix) {
                self.inner.invalidate(key.as_ref());
            }
        }
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Number of cached entries (approximate under concurrency).
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new()
    }
}
