//! Background synchronization: timers, lifecycle and the fetch/upsert jobs.

mod actor;
pub mod scheduler;
mod tasks;

pub use actor::{SyncManager, SyncMessage};
pub use scheduler::{SyncSnapshot, SyncState, TaskCounters, TaskKind, TaskSnapshot};
pub use tasks::SyncContext;
