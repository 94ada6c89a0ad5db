//! Data ingestion for the flowphase system.
//!
//! This crate handles:
//! - Provider interfaces for price/volume samples and auxiliary series
//! - An in-memory provider backed by a JSON market snapshot
//! - Period building (fixed-size sample windows)

pub mod memory;
pub mod period_builder;
pub mod provider;

pub use memory::{InMemoryProvider, MarketSnapshot};
pub use period_builder::{PeriodBar, PeriodBuilder};
pub use provider::{AuxSeriesProvider, FetchResult, SampleProvider};
