use std::collections::HashMap;

/// Memoizes fetched instruction words by physical word address.
///
/// Every write into a backing buffer must call `invalidate` (or `clear`
/// for bulk transfers), otherwise self-modifying code runs stale words.
#[derive(Debug, Default)]
pub struct ICache {
    enabled: bool,
    lines:   HashMap<u32, u32>,
    pub hits:   u64,
    pub misses: u64,
}

impl ICache {
    pub fn new(enabled: bool) -> ICache {
        ICache { enabled, ..ICache::default() }
    }

    pub fn lookup(&mut self, phys: u32) -> Option<u32> {
        if !self.enabled {
            return None;
        }
        let hit = self.lines.get(&phys).copied();
        if hit.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hit
    }

    pub fn fill(&mut self, phys: u32, word: u32) {
        if self.enabled {
            self.lines.insert(phys, word);
        }
    }

    #[inline]
    pub fn invalidate(&mut self, phys: u32) {
        if !self.lines.is_empty() {
            self.lines.remove(&(phys & !0b11));
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}
