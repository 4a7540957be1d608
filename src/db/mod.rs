//! Database module: the record store and its per-collection actors.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `models.rs`: Rust structs mirroring DB rows
//! - `collection.rs`: table knowledge per record type
//! - `actor.rs`: one serializing actor per collection
//! - `query.rs`: the range/order/limit query builder
//! - `metadata.rs`: the `storage_metadata` singleton
//! - `store.rs`: two-phase `create` / `open` lifecycle

pub mod actor;
pub mod collection;
pub mod metadata;
pub mod models;
pub mod query;
pub mod schema;
pub mod store;

pub use actor::CollectionHandle;
pub use collection::{
    BriefingField, BriefingPatch, Briefings, Collection, Crew, CrewField, CrewPatch, PositionField,
    PositionPatch, Positions, TleField, TlePatch, Tles,
};
pub use metadata::MetadataStore;
pub use models::StorageMetadata;
pub use query::{CollectionQuery, Direction, FieldValue, Op};
pub use schema::{CURRENT_SCHEMA_VERSION, SQLITE_INIT};
pub use store::{PendingStore, RecordStore};
