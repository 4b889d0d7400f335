//! Profile normalization for the ecosim pipeline.
//!
//! This crate handles:
//! - Slot interpolation of power profiles into energy per slot
//! - Multi-day replication of daily profiles
//! - The end-to-end profile reading pipeline
//! - Validation of normalized profiles

pub mod interpolator;
pub mod pipeline;
pub mod replication;
pub mod validator;

pub use interpolator::{SlotInterpolator, SlotSeries};
pub use pipeline::{read_profile_without_config, ProfileReader, ReadReport};
pub use replication::{copy_profile_to_multiple_days, profile_span};
pub use validator::ProfileValidator;
