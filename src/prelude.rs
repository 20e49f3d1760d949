pub use crate::builder::LoadingCacheBuilder;
pub use crate::cache::LoadingCache;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::traits::Loader;
