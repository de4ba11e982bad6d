//! Data models for the EcoLens service
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and resolution provenance
//! - Domain: Upstream data categories and domain sets
//! - Temporal: Temporal scope of a question and its fetch window
//! - Sample: Hourly provider series and per-domain snapshots
//! - Glacier: Glacier mass-balance records

pub mod domain;
pub mod glacier;
pub mod location;
pub mod sample;
pub mod temporal;

// Re-export all public types for convenient access
pub use domain::{Domain, DomainSet};
pub use glacier::{GlacierDataset, GlacierRecord};
pub use location::{Location, LocationCandidate, LocationSource};
pub use sample::{DomainSample, HourlySeries};
pub use temporal::{FetchWindow, TemporalScope};
