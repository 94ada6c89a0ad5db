//! Core types and configuration for the flowphase system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (samples, auxiliary series, periods)
//! - Signal and phase types produced by the classifier
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AlignmentConfig, Config, FetchConfig, InstrumentConfig, RhythmConfig, TimeframeConfig,
};
pub use error::{Error, FetchError, Result};
pub use types::*;
