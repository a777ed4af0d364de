//! On-disk license cache.
//!
//! - [`key`] — the `(type, name[, version])` composite key and its file location.
//! - [`record`] — the record type and its front-matter + license-sections text format.
//! - [`store`] — reading and atomically writing record files.

pub mod key;
pub mod record;
pub mod store;

pub use key::CacheKey;
pub use record::CacheRecord;
pub use store::CacheStore;
