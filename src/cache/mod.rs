//! Cache Module
//!
//! Two-tier expiration (absolute and sliding) layered on a backend that only
//! knows one TTL per key.

pub mod codec;
mod engine;
pub mod entry;
pub mod expiration;
mod policy;


// Re-export public types
pub use codec::{JsonCodec, ValueCodec};
pub use engine::{DistributedCache, KeyStream};
pub use entry::{CacheEntry, EntryMetadata};
pub use policy::CachePolicy;

// == Public Constants ==
/// Keys examined per backend round trip when scanning, unless told otherwise
pub const DEFAULT_PAGE_SIZE: usize = 1000;
