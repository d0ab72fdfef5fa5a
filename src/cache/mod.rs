//! Cache module for storing provider results on disk
//!
//! One timestamped JSON record per purpose (location or weather). Records that
//! fail to parse are deleted on read, so the next cycle starts from a cold cache.

mod manager;

pub use manager::{CacheError, CacheKind, CacheStore, CachedRecord};
