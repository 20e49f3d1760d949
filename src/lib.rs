//! oncelru: a capacity-bounded LRU cache whose misses are filled by a
//! loader, with concurrent misses for one key collapsed into a single load.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod prelude;
pub mod traits;

pub use crate::cache::LoadingCache;
