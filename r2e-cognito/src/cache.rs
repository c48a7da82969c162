use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Storage backing the JWKS cache.
///
/// Values are whole serialized key sets; a refresh replaces the entry and
/// never patches it. Implement this to keep key sets in Redis or another
/// shared store instead of process memory.
pub trait KeySetStore: Send + Sync + 'static {
    fn get<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Option<Bytes>> + Send + 'a>>;
    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// A cached key set with the moment it was fetched.
#[derive(Clone)]
struct CacheEntry {
    value: Bytes,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// Default in-process store backed by `DashMap`.
///
/// Stale entries are evicted lazily on access.
#[derive(Clone, Default)]
pub struct InMemoryKeySetStore {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryKeySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, stale or not.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeySetStore for InMemoryKeySetStore {
    fn get<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Option<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(entry) = self.inner.get(key) {
                if entry.is_fresh() {
                    return Some(entry.value.clone());
                }
                // Drop the read guard before removing
                drop(entry);
                self.inner.remove_if(key, |_, entry| !entry.is_fresh());
            }
            None
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes, ttl: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let entry = CacheEntry {
                value,
                fetched_at: Instant::now(),
                ttl,
            };
            self.inner.insert(key.to_string(), entry);
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner.remove(key);
        })
    }
}
