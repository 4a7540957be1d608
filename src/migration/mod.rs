//! One-shot import of the legacy snapshot into the record store.

mod legacy;
mod runner;

pub use legacy::{
    JsonLegacyStore, LegacyBriefing, LegacyCrew, LegacyPosition, LegacySnapshot, LegacyStore,
    LegacyTle,
};
pub use runner::{InsertCount, MigrationNotice, MigrationResult, MigrationRunner};
