//! Order flow aggregation.
//!
//! Splits each sample's volume into aggressor-buy and aggressor-sell volume
//! and sums the net delta per period.

use flowphase_core::Sample;
use serde::{Deserialize, Serialize};

/// Order flow metrics for a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    /// Sum of taker buy volume.
    pub buy_volume: f64,
    /// Sum of (volume - taker buy volume).
    pub sell_volume: f64,
    /// Sum of per-sample deltas.
    pub net_flow: f64,
}

/// Accumulator for order flow within a period.
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulator {
    buy_volume: f64,
    sell_volume: f64,
    net_flow: f64,
}

impl FlowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample. Negative sell volume is kept as is.
    pub fn add(&mut self, sample: &Sample) {
        self.buy_volume += sample.buy_volume();
        self.sell_volume += sample.sell_volume();
        self.net_flow += sample.delta();
    }

    /// Add multiple samples.
    pub fn add_samples(&mut self, samples: &[Sample]) {
        for sample in samples {
            self.add(sample);
        }
    }

    pub fn to_metrics(&self) -> FlowMetrics {
        FlowMetrics {
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
            net_flow: self.net_flow,
        }
    }
}

/// Order flow of one period's member samples.
pub fn period_flow(samples: &[Sample]) -> FlowMetrics {
    let mut acc = FlowAccumulator::new();
    acc.add_samples(samples);
    acc.to_metrics()
}
