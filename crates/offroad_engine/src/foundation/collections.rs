//! Specialized collection types

use slotmap::{Key, SlotMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Arena of resources addressed by stable slot-map keys, with a secondary
/// index from canonical source path to key.
///
/// At most one entry exists per path: `insert` refuses a path that is
/// already registered and hands back the existing key instead.
pub struct PathRegistry<K: Key, V> {
    entries: SlotMap<K, V>,
    by_path: HashMap<PathBuf, K>,
}

impl<K: Key, V> PathRegistry<K, V> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_path: HashMap::new(),
        }
    }

    /// Key previously registered for `path`
    pub fn lookup(&self, path: &Path) -> Option<K> {
        self.by_path.get(path).copied()
    }

    /// Register `value` under `path`.
    ///
    /// Returns `Err((existing, value))` when the path is already taken so the
    /// caller can release whatever it built.
    pub fn insert(&mut self, path: PathBuf, value: V) -> Result<K, (K, V)> {
        if let Some(existing) = self.by_path.get(&path) {
            return Err((*existing, value));
        }
        let key = self.entries.insert(value);
        self.by_path.insert(path, key);
        Ok(key)
    }

    /// Resource stored under `key`
    pub fn get(&self, key: K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry, yielding the owned values for teardown
    pub fn drain(&mut self) -> impl Iterator<Item = V> + '_ {
        self.by_path.clear();
        self.entries.drain().map(|(_, value)| value)
    }
}

impl<K: Key, V> Default for PathRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    slotmap::new_key_type! { struct TestKey; }

    #[test]
    fn test_duplicate_path_returns_existing_key() {
        let mut registry: PathRegistry<TestKey, u32> = PathRegistry::new();
        let first = registry.insert(PathBuf::from("/a"), 1).ok();
        let second = registry.insert(PathBuf::from("/a"), 2);

        assert_eq!(second, Err((first.unwrap_or_default(), 2)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(first.unwrap_or_default()), Some(&1));
    }

    #[test]
    fn test_drain_empties_both_indices() {
        let mut registry: PathRegistry<TestKey, u32> = PathRegistry::new();
        let _ = registry.insert(PathBuf::from("/a"), 1);
        let _ = registry.insert(PathBuf::from("/b"), 2);

        let mut drained: Vec<u32> = registry.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2]);
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(Path::new("/a")), None);
    }
}
