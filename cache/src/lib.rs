//! Cost-bounded in-memory cache.
//!
//! [`BoundedCache`] keeps the aggregate cost of its entries (usually bytes)
//! under a fixed ceiling, evicting least-recently-used entries to make room.
//! A miss is never an error: callers treat absence as data.
//!
//! # Example
//!
//! ```
//! use geofeed_cache::BoundedCache;
//!
//! let thumbnails = BoundedCache::<String, Vec<u8>>::new(1024);
//! thumbnails.set("https://cdn/a.jpg".to_string(), vec![0u8; 600], 600);
//! thumbnails.set("https://cdn/b.jpg".to_string(), vec![0u8; 600], 600);
//!
//! // a.jpg was evicted to keep the total under 1024.
//! assert!(thumbnails.get("https://cdn/a.jpg").is_none());
//! assert_eq!(thumbnails.total_cost(), 600);
//! ```

mod bounded;
mod stats;

pub use bounded::BoundedCache;
pub use stats::CacheStats;
