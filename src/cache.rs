//! Session-scoped query cache.
//!
//! Results are stored per [`QueryKey`] and invalidated per [`QueryFamily`].
//! Every family carries a generation counter: a fetch records the generation
//! when it starts and its result is dropped if the family was invalidated
//! before it finished, so a read that raced a write never repopulates the
//! cache with pre-write data.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    Issues,
    MyIssues,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Issues,
    MyIssues(Uuid),
    Profile(Uuid),
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::Issues => QueryFamily::Issues,
            QueryKey::MyIssues(_) => QueryFamily::MyIssues,
            QueryKey::Profile(_) => QueryFamily::Profile,
        }
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
}

/// Handed out by [`QueryCache::begin`]; pass it back to [`QueryCache::store`].
#[derive(Debug, Clone, Copy)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> QueryKey {
        self.key
    }
}

pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    generations: DashMap<QueryFamily, Arc<AtomicU64>>,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            ttl,
        }
    }

    fn generation(&self, family: QueryFamily) -> Arc<AtomicU64> {
        self.generations
            .entry(family)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.get(key)?;
        if let Some(ttl) = self.ttl {
            if entry.stored_at.elapsed() > ttl {
                drop(entry);
                // Re-checked under the shard lock so a fresh store survives.
                self.entries
                    .remove_if(key, |_, entry| entry.stored_at.elapsed() > ttl);
                return None;
            }
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn begin(&self, key: QueryKey) -> FetchTicket {
        let generation = self.generation(key.family()).load(Ordering::Acquire);
        FetchTicket { key, generation }
    }

    /// Stores a fetched value. Returns `false` when the family was invalidated
    /// after the ticket was issued; the value is discarded in that case.
    pub fn store<T>(&self, ticket: FetchTicket, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        let generation = self.generation(ticket.key.family());
        if generation.load(Ordering::Acquire) != ticket.generation {
            debug!(key = ?ticket.key, "discarding fetch result superseded by invalidation");
            return false;
        }
        self.entries.insert(
            ticket.key,
            CacheEntry {
                value: Arc::new(value),
                stored_at: Instant::now(),
            },
        );
        // An invalidation may have landed between the check and the insert.
        if generation.load(Ordering::Acquire) != ticket.generation {
            self.entries.remove(&ticket.key);
            return false;
        }
        true
    }

    pub fn invalidate(&self, family: QueryFamily) {
        self.generation(family).fetch_add(1, Ordering::AcqRel);
        self.entries.retain(|key, _| key.family() != family);
        debug!(?family, "invalidated cached queries");
    }

    pub fn clear(&self) {
        for family in [QueryFamily::Issues, QueryFamily::MyIssues, QueryFamily::Profile] {
            self.generation(family).fetch_add(1, Ordering::AcqRel);
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}
