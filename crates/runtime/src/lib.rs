//! Multi-timeframe runtime for the flowphase system.
//!
//! This crate provides:
//! - The orchestrator running one pipeline task per timeframe
//! - Report types handed to presentation layers

pub mod orchestrator;
pub mod report;

pub use orchestrator::Orchestrator;
pub use report::{MarketReport, PeriodSignal, TimeframeReport, TimeframeStatus};
