//! Builder for [`LoadingCache`].
//!
//! Collects the capacity and the loader separately, which is convenient when
//! they come from different places (configuration vs. service wiring).
//!
//! ## Example
//!
//! ```rust
//! use oncelru::builder::LoadingCacheBuilder;
//!
//! let cache = LoadingCacheBuilder::new(100)
//!     .loader(|key: &u64| -> Result<String, String> { Ok(key.to_string()) })
//!     .try_build()
//!     .unwrap();
//!
//! assert_eq!(*cache.get(&7).unwrap(), "7");
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::LoadingCache;
use crate::error::ConfigError;
use crate::traits::Loader;

/// Configuration for a [`LoadingCache`].
pub struct LoadingCacheBuilder<K, V, E> {
    capacity: usize,
    loader: Option<Arc<dyn Loader<K, V, E>>>,
}

impl<K, V, E> LoadingCacheBuilder<K, V, E>
where
    K: Eq + Hash + Clone,
    E: Clone,
{
    /// Starts a builder for a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            loader: None,
        }
    }

    /// Overrides the capacity given to [`new`](Self::new).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the loader from a closure.
    pub fn loader<F>(self, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        self.with_loader(loader)
    }

    /// Sets the loader from any [`Loader`] implementation.
    pub fn with_loader(mut self, loader: impl Loader<K, V, E> + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Builds the cache, failing if no loader was set.
    pub fn try_build(self) -> Result<LoadingCache<K, V, E>, ConfigError> {
        let loader = self
            .loader
            .ok_or_else(|| ConfigError::new("a loader is required to build a LoadingCache"))?;
        Ok(LoadingCache::from_parts(self.capacity, loader))
    }
}

impl<K, V, E> fmt::Debug for LoadingCacheBuilder<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingCacheBuilder")
            .field("capacity", &self.capacity)
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Square;

    impl Loader<u32, u64, String> for Square {
        fn load(&self, key: &u32) -> Result<u64, String> {
            Ok(u64::from(*key) * u64::from(*key))
        }
    }

    #[test]
    fn missing_loader_is_config_error() {
        let err = LoadingCacheBuilder::<u32, u64, String>::new(4)
            .try_build()
            .unwrap_err();
        assert!(err.message().contains("loader"));
    }

    #[test]
    fn builds_with_struct_loader() {
        let cache = LoadingCacheBuilder::new(4)
            .with_loader(Square)
            .try_build()
            .unwrap();
        assert_eq!(*cache.get(&12).unwrap(), 144);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn capacity_override_applies() {
        let cache = LoadingCacheBuilder::new(4)
            .capacity(0)
            .loader(|key: &u32| -> Result<u32, ()> { Ok(*key) })
            .try_build()
            .unwrap();
        assert_eq!(cache.capacity(), 0);
        assert_eq!(*cache.get(&5).unwrap(), 5);
        assert!(cache.is_empty());
    }

    #[test]
    fn debug_hides_loader() {
        let builder = LoadingCacheBuilder::<u32, u32, ()>::new(2);
        assert_eq!(
            format!("{builder:?}"),
            "LoadingCacheBuilder { capacity: 2, has_loader: false }"
        );
    }
}
