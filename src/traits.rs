//! The loader seam between the cache and the expensive computation behind it.
//!
//! [`LoadingCache`](crate::cache::LoadingCache) never produces values itself.
//! On a miss it calls a [`Loader`] exactly once per key generation, outside
//! of its structural lock, and shares the outcome with every caller that
//! asked for that generation.
//!
//! Closures implement `Loader` through a blanket impl:
//!
//! ```
//! use oncelru::traits::Loader;
//!
//! let double = |key: &u32| -> Result<u32, String> { Ok(key * 2) };
//! assert_eq!(double.load(&21u32), Ok(42));
//! ```
//!
//! Struct loaders are useful when the computation carries its own state:
//!
//! ```
//! use std::collections::HashMap;
//! use oncelru::traits::Loader;
//!
//! struct Lookup(HashMap<&'static str, u64>);
//!
//! impl Loader<&'static str, u64, String> for Lookup {
//!     fn load(&self, key: &&'static str) -> Result<u64, String> {
//!         self.0.get(key).copied().ok_or_else(|| format!("unknown key {key}"))
//!     }
//! }
//!
//! let lookup = Lookup(HashMap::from([("answer", 42)]));
//! assert_eq!(lookup.load(&"answer"), Ok(42));
//! assert!(lookup.load(&"question").is_err());
//! ```

/// Computes the value for a key that is not resident in the cache.
///
/// # Contract
///
/// - May be called concurrently for distinct keys.
/// - Is called at most once per key generation, but a key gets a new
///   generation after a failure, an eviction, an invalidation, or a reset, so
///   the same key can be loaded many times over the cache's lifetime.
/// - Must not call back into the same cache for the same key: the caller
///   would wait on its own load.
/// - The cache applies no timeout. A load that never returns blocks every
///   caller of that key generation.
pub trait Loader<K, V, E>: Send + Sync {
    fn load(&self, key: &K) -> Result<V, E>;
}

impl<K, V, E, F> Loader<K, V, E> for F
where
    F: Fn(&K) -> Result<V, E> + Send + Sync,
{
    #[inline]
    fn load(&self, key: &K) -> Result<V, E> {
        self(key)
    }
}
