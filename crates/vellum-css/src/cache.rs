//! Computed style cache
//!
//! Elements with the same cascaded declarations under the same parent style
//! share one [`ComputedStyle`]. Entries are keyed by the declaration-set hash
//! and the parent's style key.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::ComputedStyle;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 * 100.0 }
    }
}

/// Memoised computed styles
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: HashMap<(u64, u64), (u64, Arc<ComputedStyle>)>,
    stats: CacheStats,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key identifying the style produced by `declarations` under `parent`
    pub fn style_key(declarations: u64, parent: u64) -> u64 {
        let mut h = DefaultHasher::new();
        (declarations, parent).hash(&mut h);
        // Zero is reserved for "no parent"
        h.finish().max(1)
    }

    /// Look up a style, counting the hit or miss
    pub fn get(&mut self, declarations: u64, parent: u64) -> Option<(u64, Arc<ComputedStyle>)> {
        match self.entries.get(&(declarations, parent)) {
            Some((key, style)) => {
                self.stats.hits += 1;
                Some((*key, Arc::clone(style)))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a style; returns its key
    pub fn insert(&mut self, declarations: u64, parent: u64, style: Arc<ComputedStyle>) -> u64 {
        let key = Self::style_key(declarations, parent);
        self.entries.insert((declarations, parent), (key, style));
        key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry (after stylesheets or defaults change)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let mut cache = StyleCache::new();
        assert!(cache.get(1, 0).is_none());
        let key = cache.insert(1, 0, Arc::new(ComputedStyle::default()));
        let (hit_key, _) = cache.get(1, 0).unwrap();
        assert_eq!(key, hit_key);
        assert!(cache.get(1, key).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn test_keys_depend_on_parent() {
        assert_ne!(StyleCache::style_key(7, 1), StyleCache::style_key(7, 2));
        assert_ne!(StyleCache::style_key(7, 1), 0);
    }
}
