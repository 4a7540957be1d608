//! Record types, upstream payload shapes and validators shared by the
//! storage engine and the gap analyzer.
//!
//! Nothing in here performs IO.

pub mod records;
pub mod upstream;
pub mod validate;

pub use records::{
    BriefingRecord, CrewRecord, PositionOrigin, PositionRecord, SYNTHETIC_VISIBILITY, TleRecord,
    TleSource,
};
pub use upstream::{CrewManifest, CrewMember, PositionPayload, TleLines};
pub use validate::{
    ValidationError, validate_crew, validate_position, validate_position_payload, validate_tle,
    validate_tle_lines,
};
