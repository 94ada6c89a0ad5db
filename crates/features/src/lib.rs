//! Feature computation for the flowphase system.
//!
//! This crate handles:
//! - Order flow (taker buy vs sell volume) per sample and per period
//! - Nearest-timestamp alignment of auxiliary series onto periods
//! - The period engine combining windows, flow and alignment

pub mod alignment;
pub mod engine;
pub mod order_flow;

pub use alignment::{AlignedAux, Aligner};
pub use engine::{AuxInputs, EngineOutput, PeriodEngine};
pub use order_flow::{FlowAccumulator, FlowMetrics};
