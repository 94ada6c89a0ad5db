//! Period engine.
//!
//! Combines period building, order flow and auxiliary alignment into the
//! per-timeframe period list.

use flowphase_core::{AuxSeries, Config, Period, Sample, TimeframeConfig};
use flowphase_ingestion::PeriodBuilder;
use tracing::{debug, warn};

use crate::alignment::Aligner;
use crate::order_flow::period_flow;

/// Auxiliary series for one timeframe. Missing series stay empty.
#[derive(Debug, Clone, Default)]
pub struct AuxInputs {
    pub open_interest: AuxSeries,
    pub whale_ratio: AuxSeries,
    pub retail_ratio: AuxSeries,
}

/// Periods produced by one engine run.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    /// Periods, oldest first.
    pub periods: Vec<Period>,
    /// Samples dropped for carrying non-finite fields.
    pub dropped_samples: usize,
    /// Auxiliary points dropped for carrying non-finite values.
    pub dropped_aux_points: usize,
}

/// Builds periods for one timeframe.
#[derive(Debug, Clone, Copy)]
pub struct PeriodEngine {
    builder: PeriodBuilder,
    aligner: Aligner,
    lookback: usize,
}

impl PeriodEngine {
    /// Create an engine for `samples_per_period` windows, keeping at most
    /// `lookback` periods.
    pub fn new(samples_per_period: usize, lookback: usize, aligner: Aligner) -> Self {
        Self {
            builder: PeriodBuilder::new(samples_per_period),
            aligner,
            lookback,
        }
    }

    /// Create an engine for a configured timeframe.
    pub fn from_config(timeframe: &TimeframeConfig, config: &Config) -> Self {
        Self::new(
            timeframe.samples_per_period,
            timeframe.lookback,
            Aligner::new(config.alignment.max_distance_ms),
        )
    }

    /// Build periods from samples and auxiliary series.
    pub fn run(&self, samples: &[Sample], mut aux: AuxInputs) -> EngineOutput {
        let mut clean: Vec<Sample> = Vec::with_capacity(samples.len());
        for sample in samples {
            match sample.validate() {
                Ok(()) => clean.push(*sample),
                Err(e) => warn!("dropping sample: {}", e),
            }
        }
        let dropped_samples = samples.len() - clean.len();

        if !clean.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms) {
            warn!("samples out of order, sorting {} samples", clean.len());
            clean.sort_by_key(|s| s.ts_ms);
        }

        let dropped_aux_points = aux.open_interest.retain_finite()
            + aux.whale_ratio.retain_finite()
            + aux.retail_ratio.retain_finite();
        if dropped_aux_points > 0 {
            warn!("dropped {} non-finite auxiliary points", dropped_aux_points);
        }

        let bars = self.builder.build_recent(&clean, self.lookback);
        let starts: Vec<_> = bars.iter().map(|b| b.start_ts).collect();

        let open_interest = self.aligner.align_with_change(&starts, &aux.open_interest);
        let whale = self.aligner.align_ratios(&starts, &aux.whale_ratio);
        let retail = self.aligner.align_ratios(&starts, &aux.retail_ratio);

        let periods: Vec<Period> = bars
            .iter()
            .zip(open_interest)
            .zip(whale.into_iter().zip(retail))
            .map(|((bar, oi), (whale_ratio, retail_ratio))| {
                let flow = period_flow(&clean[bar.members.clone()]);
                Period {
                    start_ts: bar.start_ts,
                    end_ts: bar.end_ts,
                    sample_count: bar.sample_count(),
                    open: bar.open,
                    close: bar.close,
                    price_change_pct: bar.price_change_pct,
                    buy_volume: flow.buy_volume,
                    sell_volume: flow.sell_volume,
                    net_flow: flow.net_flow,
                    aux_value: oi.value,
                    aux_change_pct: oi.change_pct,
                    whale_ratio,
                    retail_ratio,
                }
            })
            .collect();

        debug!(
            "built {} periods from {} samples (window {})",
            periods.len(),
            clean.len(),
            self.builder.window()
        );

        EngineOutput {
            periods,
            dropped_samples,
            dropped_aux_points,
        }
    }
}
