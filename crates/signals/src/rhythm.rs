//! Multi-period rhythm summary.
//!
//! Sums flow and price change over the most recent periods of a timeframe
//! and flags divergence between the two.

use flowphase_core::config::RhythmConfig;
use flowphase_core::{Period, RhythmVerdict, TimestampMs};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Period with the largest net inflow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPeriod {
    pub start_ts: TimestampMs,
    pub net_flow: f64,
}

/// Rhythm of one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmSummary {
    pub verdict: RhythmVerdict,
    /// Periods inspected.
    pub window: usize,
    /// Sum of net flow over the window.
    pub cumulative_flow: f64,
    /// Sum of price change (%) over the window.
    pub cumulative_price_change_pct: f64,
    /// Largest net inflow among all periods, if any.
    pub peak_inflow: Option<PeakPeriod>,
}

/// Summarize `periods` (oldest first).
pub fn summarize(periods: &[Period], config: &RhythmConfig) -> RhythmSummary {
    let peak_inflow = periods
        .iter()
        .filter(|p| p.net_flow.is_finite())
        .max_by_key(|p| OrderedFloat(p.net_flow))
        .map(|p| PeakPeriod {
            start_ts: p.start_ts,
            net_flow: p.net_flow,
        });

    if config.window == 0 || periods.len() < config.window {
        return RhythmSummary {
            verdict: RhythmVerdict::InsufficientData,
            window: periods.len(),
            cumulative_flow: 0.0,
            cumulative_price_change_pct: 0.0,
            peak_inflow,
        };
    }

    let recent = &periods[periods.len() - config.window..];
    let cumulative_flow: f64 = recent.iter().map(|p| p.net_flow).sum();
    let cumulative_price_change_pct: f64 = recent.iter().map(|p| p.price_change_pct).sum();
    let threshold = config.divergence_price_pct;

    let verdict = if cumulative_flow > 0.0 && cumulative_price_change_pct < -threshold {
        RhythmVerdict::MajorBullishDivergence
    } else if cumulative_flow < 0.0 && cumulative_price_change_pct > threshold {
        RhythmVerdict::MajorBearishDivergence
    } else if cumulative_flow > 0.0 {
        RhythmVerdict::HealthyAccumulation
    } else {
        RhythmVerdict::Weakness
    };

    debug!(
        "rhythm over {} periods: flow {:.0}, price {:.2}% -> {:?}",
        config.window, cumulative_flow, cumulative_price_change_pct, verdict
    );

    RhythmSummary {
        verdict,
        window: config.window,
        cumulative_flow,
        cumulative_price_change_pct,
        peak_inflow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn make_period(i: i64, price_change_pct: f64, net_flow: f64) -> Period {
        Period {
            start_ts: i,
            end_ts: i,
            sample_count: 1,
            open: 100.0,
            close: 100.0 * (1.0 + price_change_pct / 100.0),
            price_change_pct,
            buy_volume: net_flow.max(0.0),
            sell_volume: (-net_flow).max(0.0),
            net_flow,
            aux_value: 0.0,
            aux_change_pct: 0.0,
            whale_ratio: None,
            retail_ratio: None,
        }
    }

    fn summarize_pairs(pairs: &[(f64, f64)]) -> RhythmSummary {
        let periods: Vec<Period> = pairs
            .iter()
            .enumerate()
            .map(|(i, &(p, f))| make_period(i as i64, p, f))
            .collect();
        summarize(&periods, &RhythmConfig::default())
    }

    #[test]
    fn test_insufficient_data() {
        let summary = summarize_pairs(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert_eq!(summary.verdict, RhythmVerdict::InsufficientData);
        assert_eq!(summary.window, 3);
    }

    #[test]
    fn test_bullish_divergence() {
        let summary = summarize_pairs(&[(-2.0, 5.0), (-2.0, 5.0), (-1.0, -1.0), (-1.0, 1.0)]);
        assert_eq!(summary.verdict, RhythmVerdict::MajorBullishDivergence);
        assert_abs_diff_eq!(summary.cumulative_flow, 10.0);
        assert_abs_diff_eq!(summary.cumulative_price_change_pct, -6.0);
    }

    #[test]
    fn test_bearish_divergence() {
        let summary = summarize_pairs(&[(3.0, -1.0), (3.0, -1.0), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(summary.verdict, RhythmVerdict::MajorBearishDivergence);
    }

    #[test]
    fn test_threshold_is_strict() {
        let summary = summarize_pairs(&[(-2.5, 1.0), (-2.5, 1.0), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(summary.verdict, RhythmVerdict::HealthyAccumulation);
    }

    #[test]
    fn test_weakness() {
        let summary = summarize_pairs(&[(0.0, 0.0); 4]);
        assert_eq!(summary.verdict, RhythmVerdict::Weakness);
    }

    #[test]
    fn test_only_recent_window_counted() {
        // The large outflow falls outside the last four periods
        let summary =
            summarize_pairs(&[(10.0, -100.0), (0.5, 1.0), (0.5, 1.0), (0.5, 1.0), (0.5, 1.0)]);
        assert_eq!(summary.verdict, RhythmVerdict::HealthyAccumulation);
        assert_abs_diff_eq!(summary.cumulative_flow, 4.0);
    }

    #[test]
    fn test_peak_inflow() {
        let summary = summarize_pairs(&[(0.0, 3.0), (0.0, 9.0), (0.0, -20.0), (0.0, 1.0)]);
        let peak = summary.peak_inflow.unwrap();
        assert_eq!(peak.start_ts, 1);
        assert_abs_diff_eq!(peak.net_flow, 9.0);
    }

    #[test]
    fn test_empty() {
        let summary = summarize(&[], &RhythmConfig::default());
        assert_eq!(summary.verdict, RhythmVerdict::InsufficientData);
        assert!(summary.peak_inflow.is_none());
    }
}
