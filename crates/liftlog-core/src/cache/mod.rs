//! Query cache for avoiding redundant fetches across navigations.
//!
//! This module provides:
//! - `CacheKey`: structured keys derived from query identity
//! - `QueryCache`: a clonable handle over the shared in-memory cache
//! - `CacheStore`: the persistence seam, with `FileStore` and `MemoryStore`
//!
//! Entries live until they are invalidated. Their age is tracked only for
//! display.

pub mod entry;
pub mod key;
pub mod query_cache;
pub mod store;

pub use entry::CachedData;
pub use key::CacheKey;
pub use query_cache::{CacheStats, Invalidate, QueryCache};
pub use store::{CacheStore, FileStore, MemoryStore};
