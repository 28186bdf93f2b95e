use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

/// Compile-once cache for parametrised kernels.
///
/// Each key owns its own slot lock, so concurrent first use of the same key
/// runs the compile closure once while other callers block on the slot.
/// Different keys compile independently. A failed compile leaves the slot
/// empty and the next caller retries.
pub struct KernelCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> KernelCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, compiling it with `compile` on first use.
    pub fn get_or_compile<E>(
        &self,
        key: &K,
        compile: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut guard = slot.lock();
        if let Some(value) = guard.as_ref() {
            return Ok(Arc::clone(value));
        }

        tracing::debug!(?key, "compiling kernel variant");
        let value = Arc::new(compile(key)?);
        *guard = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Number of successfully compiled entries.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<V>> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        let slot = self.slots.lock().get(key).cloned();
        match slot {
            Some(slot) => {
                let compiled = slot.lock().is_some();
                compiled
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

impl<K, V> Default for KernelCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for KernelCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCache")
            .field("keys", &self.slots.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_compiles_once_per_key() {
        let cache: KernelCache<u32, String> = KernelCache::new();
        let calls = AtomicUsize::new(0);

        let compile = |k: &u32| -> Result<String, ()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("kernel_{k}"))
        };

        let a = cache.get_or_compile(&3, compile).unwrap();
        let b = cache.get_or_compile(&3, compile).unwrap();
        let c = cache.get_or_compile(&5, compile).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*c, "kernel_5");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&3));
        assert!(!cache.contains(&7));
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache: KernelCache<&'static str, u32> = KernelCache::new();

        let err = cache.get_or_compile(&"k", |_| Err::<u32, _>("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert!(!cache.contains(&"k"));
        assert!(cache.is_empty());

        let ok = cache.get_or_compile(&"k", |_| Ok::<_, &str>(9)).unwrap();
        assert_eq!(*ok, 9);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_use_is_single_flight() {
        let cache: KernelCache<(u8, u8), usize> = KernelCache::new();
        let calls = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let v = cache
                        .get_or_compile(&(1, 3), |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(42)
                        })
                        .unwrap();
                    assert_eq!(*v, 42);
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let cache: KernelCache<u8, u8> = KernelCache::default();
        cache.get_or_compile(&1, |_| Ok::<_, ()>(1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
