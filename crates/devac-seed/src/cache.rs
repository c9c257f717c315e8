//! LRU cache of query results keyed by SQL text, invalidated wholesale on
//! any write to the owning package (§4.4).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::query::QueryResult;

pub struct QueryCache {
    inner: Mutex<LruCache<String, QueryResult>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, sql: &str) -> Option<QueryResult> {
        self.inner.lock().ok()?.get(sql).cloned()
    }

    pub fn put(&self, sql: &str, result: &QueryResult) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(sql.to_string(), result.clone());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(time_ms: u64) -> QueryResult {
        QueryResult { rows: vec![], row_count: 0, time_ms }
    }

    #[test]
    fn caches_and_invalidates() {
        let cache = QueryCache::new(4);
        assert!(cache.get("select 1").is_none());
        cache.put("select 1", &result(5));
        assert_eq!(cache.get("select 1").unwrap().time_ms, 5);
        cache.clear();
        assert!(cache.get("select 1").is_none());
    }
}
