//! Configuration, types, and shared structures for specdiv.
//!
//! This crate contains the signal and spectrum types, the comparison
//! configuration and the metric trait shared across the specdiv workspace.

pub mod config;
pub mod error;
pub mod signal;
pub mod traits;

pub use config::{CompareConfig, CompareParams, ZeroBinPolicy};
pub use error::CoreError;
pub use signal::{AudioSignal, DivergenceReport, DivergenceScore, SpectrumMagnitude};
pub use traits::SpectralMetric;
