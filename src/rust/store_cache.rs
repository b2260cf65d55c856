use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::vector_store::{StoreError, VectorStore};

type Slot = Arc<Mutex<Option<Arc<VectorStore>>>>;

/// Shared registry of loaded vector stores, keyed by canonical path.
///
/// Each path is parsed at most once. Concurrent first loads of the same path
/// wait on a per-path slot, so exactly one thread parses the file and every
/// caller receives the same `Arc`. Loads of different paths do not block
/// each other.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use wordspace::VectorStoreCache;
/// use std::sync::Arc;
///
/// let cache = VectorStoreCache::new();
/// let first = cache.load("vectors/glove.6B.50d.bin")?;
/// let second = cache.load("vectors/glove.6B.50d.bin")?;
/// assert!(Arc::ptr_eq(&first, &second));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct VectorStoreCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    load_count: AtomicUsize,
}

impl VectorStoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store for `path`, parsing the file on first use.
    ///
    /// # Errors
    /// - `IoError` if the path cannot be resolved or read
    /// - `CorruptFormat` if the file is malformed; nothing is cached in that case
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<VectorStore>, StoreError> {
        let key = fs::canonicalize(path.as_ref())?;

        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut guard = slot.lock();
        if let Some(store) = guard.as_ref() {
            log::debug!("Vector store cache hit for {:?}", key);
            return Ok(Arc::clone(store));
        }

        log::info!("Vector store cache miss for {:?}, loading", key);
        self.load_count.fetch_add(1, Ordering::SeqCst);
        match VectorStore::load(&key) {
            Ok(store) => {
                let store = Arc::new(store);
                *guard = Some(Arc::clone(&store));
                Ok(store)
            }
            Err(e) => {
                log::error!("Failed to load vector store {:?}: {}", key, e);
                drop(guard);
                self.discard_empty_slot(&key, &slot);
                Err(e)
            }
        }
    }

    /// Whether a loaded store is cached for `path`.
    pub fn is_cached<P: AsRef<Path>>(&self, path: P) -> bool {
        let Ok(key) = fs::canonicalize(path.as_ref()) else {
            return false;
        };
        let slot = self.slots.lock().get(&key).cloned();
        slot.map_or(false, |slot| slot.lock().is_some())
    }

    /// Drops the cached store for `path`. Holders of the `Arc` keep their copy.
    pub fn evict<P: AsRef<Path>>(&self, path: P) -> bool {
        match fs::canonicalize(path.as_ref()) {
            Ok(key) => self.slots.lock().remove(&key).is_some(),
            Err(_) => false,
        }
    }

    /// Number of parse passes performed so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Number of paths with a slot, loaded or in flight.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn discard_empty_slot(&self, key: &Path, slot: &Slot) {
        let mut slots = self.slots.lock();
        let unchanged = slots.get(key).map_or(false, |current| Arc::ptr_eq(current, slot));
        if unchanged && slot.lock().is_none() {
            slots.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_store;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_same_path_same_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), "vectors.bin", &[("dog", vec![1.0, 0.0])]);
        let cache = VectorStoreCache::new();

        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 1);
        assert!(cache.is_cached(&path));
    }

    #[test]
    fn test_relative_and_absolute_paths_share_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), "vectors.bin", &[("dog", vec![1.0])]);
        let indirect = dir.path().join(".").join("vectors.bin");
        let cache = VectorStoreCache::new();

        let first = cache.load(&path).unwrap();
        let second = cache.load(&indirect).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_load_parses_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), "vectors.bin", &[("dog", vec![1.0, 2.0, 3.0])]);
        let cache = Arc::new(VectorStoreCache::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.load(&path).unwrap()
                })
            })
            .collect();

        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
        assert_eq!(cache.load_count(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        fs::write(&path, b"not a header").unwrap();
        let cache = VectorStoreCache::new();

        assert!(matches!(cache.load(&path), Err(StoreError::CorruptFormat(_))));
        assert!(!cache.is_cached(&path));
        assert!(cache.is_empty());

        write_store(dir.path(), "vectors.bin", &[("dog", vec![1.0])]);
        let store = cache.load(&path).unwrap();
        assert!(store.contains("dog"));
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn test_missing_file() {
        let cache = VectorStoreCache::new();
        assert!(matches!(
            cache.load("/nonexistent/wordspace/vectors.bin"),
            Err(StoreError::IoError(_))
        ));
    }

    #[test]
    fn test_evict_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), "vectors.bin", &[("dog", vec![1.0])]);
        let cache = VectorStoreCache::new();

        let first = cache.load(&path).unwrap();
        assert!(cache.evict(&path));
        let second = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 2);
    }
}
