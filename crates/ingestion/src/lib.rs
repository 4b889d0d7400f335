//! Profile ingestion and normalization for the ecosim pipeline.
//!
//! This crate handles:
//! - Time key format detection
//! - Decoding serialized profile strings
//! - Reading files, mappings and scalars into timestamped profiles
//! - Gap filling against a canonical slot set

pub mod gap_filler;
pub mod ingestor;
pub mod literal;
pub mod time_keys;

pub use gap_filler::fill_gaps;
pub use ingestor::{Ingested, ProfileIngestor, ProfileInput, SourceKind};
pub use literal::{parse_literal, Literal};
pub use time_keys::{TimeKeyFormat, TimeKeyNormalizer};
