//! Error types for the oncelru library.
//!
//! Loader failures are not represented here: [`LoadingCache::get`] hands back
//! whatever error type the loader produces, verbatim. This module only covers
//! the cache's own conditions.
//!
//! - [`ConfigError`]: returned by [`LoadingCacheBuilder::try_build`] when the
//!   configuration is incomplete.
//! - [`InvariantError`]: returned by `check_invariants` when the key index and
//!   the recency list disagree.
//!
//! ```
//! use oncelru::builder::LoadingCacheBuilder;
//! use oncelru::error::ConfigError;
//!
//! let missing_loader = LoadingCacheBuilder::<u32, u32, ()>::new(8).try_build();
//! let err: ConfigError = missing_loader.unwrap_err();
//! assert!(err.to_string().contains("loader"));
//! ```
//!
//! [`LoadingCache::get`]: crate::cache::LoadingCache::get
//! [`LoadingCacheBuilder::try_build`]: crate::builder::LoadingCacheBuilder::try_build

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`RecencyIndex::check_invariants`](crate::ds::RecencyIndex::check_invariants)
/// and [`LoadingCache::check_invariants`](crate::cache::LoadingCache::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when a cache cannot be built from the given configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
