//! Per-client mode persistence across focus changes.
//!
//! Entries are keyed by the host's focus identifier and hold the english-mode
//! flag captured at focus-out. The map is an LRU bounded by
//! `Config::registry_capacity`, so long-running hosts that see many distinct
//! clients do not grow it without limit.

use lru::LruCache;
use std::num::NonZeroUsize;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct SessionRegistry {
    entries: LruCache<String, bool>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Insert or overwrite the english-mode flag for a client.
    pub fn put(&mut self, client_id: &str, english_mode: bool) {
        if let Some((evicted, _)) = self.entries.push(client_id.to_string(), english_mode) {
            if evicted != client_id {
                tracing::debug!(client = %evicted, "evicted least recently used client state");
            }
        }
    }

    /// Stored flag for a client, if it has been seen before.
    pub fn get(&mut self, client_id: &str) -> Option<bool> {
        self.entries.get(client_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
