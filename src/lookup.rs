//! Point lookups and neighbour navigation over the shared index.
//!
//! [`HistoricalLookup`] is what query cores walk: `get_entry` resolves the
//! entry effective at a key through the index (loading through the
//! gap-filling engine on a miss), and `previous_entry` / `next_entry` step
//! to adjacent entries, recording the links they discover on the entries
//! themselves.

use std::sync::Arc;

use crate::config::HistoricalCacheConfig;
use crate::entry::{EntryRef, link_pair};
use crate::error::HistoricalResult;
use crate::gap::GapFillEngine;
use crate::index::BoundedIndexCache;
use crate::source::HistoricalSource;
use crate::time::Timestamp;

type Entry<S> = EntryRef<<S as HistoricalSource>::Value>;
type LookupResult<T, S> = HistoricalResult<T, <S as HistoricalSource>::Error>;

pub struct HistoricalLookup<S: HistoricalSource> {
    index: Arc<BoundedIndexCache<S::Value>>,
    engine: GapFillEngine<S>,
}

impl<S: HistoricalSource> HistoricalLookup<S> {
    pub fn new(source: Arc<S>, config: &HistoricalCacheConfig) -> Self {
        let index = Arc::new(BoundedIndexCache::new(config.maximum_size));
        let engine = GapFillEngine::new(source, index.clone(), config);
        Self { index, engine }
    }

    pub fn index(&self) -> &BoundedIndexCache<S::Value> {
        &self.index
    }

    pub fn engine(&self) -> &GapFillEngine<S> {
        &self.engine
    }

    /// Entry effective at `key`, cached under `key` once resolved.
    pub fn get_entry(&self, key: Timestamp) -> LookupResult<Option<Entry<S>>, S> {
        self.index.compute_if_absent(key, |k| self.engine.load_value(k))
    }

    /// Entry immediately before `entry`, or `None` if it is the first.
    pub fn previous_entry(&self, entry: &Entry<S>) -> LookupResult<Option<Entry<S>>, S> {
        match entry.previous_key() {
            Some(None) => return Ok(None),
            Some(Some(previous)) => {
                if let Some(found) = self.get_entry(previous)? {
                    if found.key() == previous {
                        return Ok(Some(found));
                    }
                }
            },
            None => {},
        }
        if entry.key() == Timestamp::MIN {
            entry.link_previous(None);
            return Ok(None);
        }
        match self.engine.read_previous_entry(entry.key())? {
            Some(found) => {
                let found = self.canonical(found);
                link_pair(&found, entry);
                Ok(Some(found))
            },
            None => {
                entry.link_previous(None);
                Ok(None)
            },
        }
    }

    /// Entry immediately after `entry`, or `None` if nothing follows yet.
    pub fn next_entry(&self, entry: &Entry<S>) -> LookupResult<Option<Entry<S>>, S> {
        if let Some(Some(next)) = entry.next_key() {
            if let Some(found) = self.get_entry(next)? {
                if found.key() == next {
                    return Ok(Some(found));
                }
            }
        }
        let Some(found) = self.engine.read_next_entry(entry.key())? else {
            return Ok(None);
        };
        let found = self.canonical(found);
        link_pair(entry, &found);
        Ok(Some(found))
    }

    /// First entry with a key `>= key`.
    pub fn first_entry_at_or_after(&self, key: Timestamp) -> LookupResult<Option<Entry<S>>, S> {
        let Some(entry) = self.get_entry(key)? else {
            return Ok(None);
        };
        if entry.key() >= key {
            return Ok(Some(entry));
        }
        match self.next_entry(&entry)? {
            Some(next) if next.key() >= key => Ok(Some(next)),
            // `entry` was a mapping older than values appended since.
            Some(_) => {
                let found = self.engine.read_next_entry(key.prev())?;
                Ok(found.map(|f| self.canonical(f)))
            },
            None => Ok(None),
        }
    }

    /// The indexed instance for `found`'s key, indexing `found` if there is
    /// none, so links land on the entry later walks will see.
    fn canonical(&self, found: Entry<S>) -> Entry<S> {
        match self.index.peek(found.key()) {
            Some(cached) if cached.key() == found.key() => cached,
            _ => {
                self.index.put_entry(&found);
                found
            },
        }
    }

    pub fn clear(&self) {
        self.index.clear();
        self.engine.request_clear();
    }
}

impl<S: HistoricalSource> std::fmt::Debug for HistoricalLookup<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalLookup")
            .field("index_len", &self.index.len())
            .field("index_capacity", &self.index.capacity())
            .field("engine", &self.engine)
            .finish()
    }
}
