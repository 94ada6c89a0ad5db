//! Signal generation for the flowphase system.
//!
//! This crate provides:
//! - The period classifier (ordered decision cascade)
//! - Coarse market phase per period
//! - Multi-period rhythm (divergence) summary

pub mod classifier;
pub mod phase;
pub mod rhythm;

pub use classifier::{classify, classify_period, ClassifierInput};
pub use phase::{market_phase, period_phase};
pub use rhythm::{summarize, PeakPeriod, RhythmSummary};
