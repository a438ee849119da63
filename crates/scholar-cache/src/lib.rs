//! # Scholar Cache
//!
//! Time-bounded cache for expensive ledger reads.
//!
//! - [`ResultCache`]: keyed by case-folded [`EntityKey`](scholar_types::EntityKey),
//!   one TTL per instance, lazy expiry on lookup and an opportunistic sweep on
//!   insert. No background timer, no size bound.
//! - [`CachedReader`]: a [`LedgerReader`](scholar_ledger::LedgerReader) that
//!   serves field reads from a shared `ResultCache` and fetches on miss.
//!
//! Failed fetches are never cached: the error goes back to the caller and
//! the next lookup misses and retries.
//!
//! ## Example
//!
//! ```rust
//! use scholar_cache::{CacheConfig, ResultCache};
//!
//! let cache: ResultCache<u32> = ResultCache::new(CacheConfig::default());
//! cache.put("0xABC", 10);
//! assert_eq!(cache.get("0xabc"), Some(10));
//! ```

pub mod cache;
pub mod config;
pub mod reader;

pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use config::CacheConfig;
pub use reader::CachedReader;
