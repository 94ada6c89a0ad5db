//! Report types.

use chrono::{DateTime, Utc};
use flowphase_core::config::RhythmConfig;
use flowphase_core::{FetchError, Granularity, MarketPhase, Period, Signal};
use flowphase_features::EngineOutput;
use flowphase_signals::{classify_period, period_phase, summarize, RhythmSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One classified period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSignal {
    /// 0 for the current period, -1 for the previous one, ...
    pub offset: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Net flow relative to traded volume.
    pub flow_ratio: f64,
    pub period: Period,
    pub signal: Signal,
    pub phase: MarketPhase,
}

impl PeriodSignal {
    fn new(offset: i64, period: Period) -> Self {
        Self {
            offset,
            start_time: period.start_time(),
            end_time: period.end_time(),
            flow_ratio: period.flow_ratio(),
            signal: classify_period(&period),
            phase: period_phase(&period),
            period,
        }
    }
}

/// Outcome of one timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeStatus {
    Ok,
    /// The provider returned no usable samples.
    NoData,
    /// The sample fetch failed or timed out.
    FetchFailed(FetchError),
    /// The pipeline task did not complete.
    TaskFailed(String),
}

/// Report for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeReport {
    pub granularity: Granularity,
    pub status: TimeframeStatus,
    /// Classified periods, most recent first.
    pub rows: Vec<PeriodSignal>,
    pub rhythm: RhythmSummary,
    /// Close of the most recent period, 0 when there is none.
    pub latest_close: f64,
    pub dropped_samples: usize,
    pub dropped_aux_points: usize,
    /// Auxiliary series that fell back to empty.
    pub aux_warnings: Vec<String>,
}

impl TimeframeReport {
    /// Report for a timeframe whose sample fetch failed.
    pub fn fetch_failed(granularity: Granularity, error: FetchError) -> Self {
        Self::failed(granularity, TimeframeStatus::FetchFailed(error))
    }

    /// Report for a timeframe whose task did not complete.
    pub fn task_failed(granularity: Granularity, reason: impl Into<String>) -> Self {
        Self::failed(granularity, TimeframeStatus::TaskFailed(reason.into()))
    }

    fn failed(granularity: Granularity, status: TimeframeStatus) -> Self {
        Self {
            granularity,
            status,
            rows: Vec::new(),
            rhythm: summarize(&[], &RhythmConfig::default()),
            latest_close: 0.0,
            dropped_samples: 0,
            dropped_aux_points: 0,
            aux_warnings: Vec::new(),
        }
    }

    /// Classify engine output. Periods arrive oldest first.
    pub fn from_output(
        granularity: Granularity,
        output: EngineOutput,
        rhythm: &RhythmConfig,
    ) -> Self {
        let status = if output.periods.is_empty() {
            TimeframeStatus::NoData
        } else {
            TimeframeStatus::Ok
        };
        let latest_close = output.periods.last().map_or(0.0, |p| p.close);
        let rhythm = summarize(&output.periods, rhythm);

        let rows = output
            .periods
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, period)| PeriodSignal::new(-(i as i64), period))
            .collect();

        Self {
            granularity,
            status,
            rows,
            rhythm,
            latest_close,
            dropped_samples: output.dropped_samples,
            dropped_aux_points: output.dropped_aux_points,
            aux_warnings: Vec::new(),
        }
    }

    pub fn with_aux_warnings(mut self, warnings: Vec<String>) -> Self {
        self.aux_warnings = warnings;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == TimeframeStatus::Ok
    }

    /// The current (most recent) row.
    pub fn current(&self) -> Option<&PeriodSignal> {
        self.rows.first()
    }
}

/// Report across all configured timeframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub timeframes: BTreeMap<Granularity, TimeframeReport>,
}

impl MarketReport {
    pub fn timeframe(&self, granularity: Granularity) -> Option<&TimeframeReport> {
        self.timeframes.get(&granularity)
    }

    /// Number of timeframes with status `Ok`.
    pub fn ok_count(&self) -> usize {
        self.timeframes.values().filter(|t| t.is_ok()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowphase_core::{RhythmVerdict, SignalKind};

    fn make_period(i: i64, price_change_pct: f64, net_flow: f64) -> Period {
        Period {
            start_ts: i * 1_000,
            end_ts: i * 1_000 + 999,
            sample_count: 1,
            open: 100.0,
            close: 100.0 + i as f64,
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

    fn output(periods: Vec<Period>) -> EngineOutput {
        EngineOutput {
            periods,
            ..EngineOutput::default()
        }
    }

    #[test]
    fn test_rows_most_recent_first() {
        let periods = vec![
            make_period(0, 0.8, 1.0),
            make_period(1, 1.0, -20_000_000.0),
            make_period(2, 0.0, 0.0),
        ];
        let report =
            TimeframeReport::from_output(Granularity::H4, output(periods), &RhythmConfig::default());

        assert_eq!(report.status, TimeframeStatus::Ok);
        let offsets: Vec<i64> = report.rows.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, -1, -2]);
        let starts: Vec<i64> = report.rows.iter().map(|r| r.period.start_ts).collect();
        assert_eq!(starts, vec![2_000, 1_000, 0]);

        assert_eq!(report.rows[0].signal.kind, SignalKind::Neutral);
        assert_eq!(report.rows[1].signal.kind, SignalKind::WeakRallyTrap);
        assert_eq!(report.rows[2].signal.kind, SignalKind::HealthyUptrend);
        assert_eq!(report.latest_close, 102.0);
        assert_eq!(report.current().unwrap().period.start_ts, 2_000);
        assert_eq!(report.rhythm.verdict, RhythmVerdict::InsufficientData);
    }

    #[test]
    fn test_empty_output_is_no_data() {
        let report =
            TimeframeReport::from_output(Granularity::D1, output(Vec::new()), &RhythmConfig::default());
        assert_eq!(report.status, TimeframeStatus::NoData);
        assert!(report.rows.is_empty());
        assert_eq!(report.latest_close, 0.0);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_failed_reports() {
        let report = TimeframeReport::fetch_failed(Granularity::M15, FetchError::Timeout(10));
        assert_eq!(report.status, TimeframeStatus::FetchFailed(FetchError::Timeout(10)));
        assert!(report.rows.is_empty());

        let report = TimeframeReport::task_failed(Granularity::M15, "task panicked");
        assert_eq!(report.status, TimeframeStatus::TaskFailed("task panicked".to_string()));
        assert!(!report.is_ok());
    }

    #[test]
    fn test_row_carries_flow_ratio() {
        let mut period = make_period(0, 0.0, 0.0);
        period.buy_volume = 75.0;
        period.sell_volume = 25.0;
        period.net_flow = 50.0;
        let report =
            TimeframeReport::from_output(Granularity::H1, output(vec![period]), &RhythmConfig::default());
        assert_eq!(report.rows[0].flow_ratio, 0.5);
    }
}
