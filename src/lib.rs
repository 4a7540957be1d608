pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod retention;
pub mod server;
pub mod sync;
pub mod upstream;
mod utils;

pub use clock::{Clock, SystemClock};
pub use db::{PendingStore, RecordStore};
pub use error::OrbitError;
pub use migration::{MigrationResult, MigrationRunner};
pub use retention::{CleanupResult, RetentionManager};
pub use sync::{SyncContext, SyncManager};
