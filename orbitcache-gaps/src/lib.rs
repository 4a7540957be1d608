//! Gap detection and repair for the position time series.
//!
//! Pure computation: callers hand in ordered samples and get back gap
//! descriptions or synthetic filler records. Orbital propagation is an
//! injected collaborator ([`Propagator`]).

mod analyzer;
mod config;
mod fill;
pub mod propagation;

pub use analyzer::{BoundedGap, GapAnalyzer, GapInfo};
pub use config::GapFillingConfig;
pub use fill::{GapFill, SkipReason};
pub use propagation::{
    KeplerPropagator, OrbitalElements, PropagatedPosition, PropagationError, Propagator,
};
