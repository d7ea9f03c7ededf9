//! Read-through cache for the aggregate listings (years, labels, tags).
//!
//! Every mutation bumps the generation and empties the map. A loader that
//! started before an invalidation never installs its result, so a stale value
//! is never served once the write has returned.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Years,
    Labels,
    Tags,
}

impl CacheKey {
    pub const ALL: [CacheKey; 3] = [CacheKey::Years, CacheKey::Labels, CacheKey::Tags];
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<CacheKey, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct ViewCache {
    state: Mutex<CacheState>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn get(&self, key: CacheKey) -> Option<Vec<String>> {
        self.state.lock().entries.get(&key).cloned()
    }

    /// Return the cached value, or run `load` without holding the lock and
    /// cache its result if nothing was invalidated in the meantime.
    pub fn get_or_load<E>(
        &self,
        key: CacheKey,
        load: impl FnOnce() -> Result<Vec<String>, E>,
    ) -> Result<Vec<String>, E> {
        let generation = {
            let state = self.state.lock();
            if let Some(values) = state.entries.get(&key) {
                return Ok(values.clone());
            }
            state.generation
        };

        let values = load()?;

        let mut state = self.state.lock();
        if state.generation == generation {
            state.entries.insert(key, values.clone());
        }
        Ok(values)
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
    }

    /// Replace the whole map at once. Refused (returns false) when an
    /// invalidation happened after `generation` was read.
    pub fn install(&self, generation: u64, entries: HashMap<CacheKey, Vec<String>>) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        state.entries = entries;
        true
    }
}
