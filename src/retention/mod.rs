//! Age- and count-bounded eviction over the record store.

mod manager;

pub use crate::config::RetentionConfig;
pub use manager::{CleanupResult, CollectionKind, RetentionManager};
