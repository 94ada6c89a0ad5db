//! Cross-series alignment.
//!
//! Maps a sparse auxiliary series onto period start timestamps by
//! nearest-timestamp lookup and derives the period-over-period change.

use flowphase_core::{AuxPoint, AuxSeries, TimestampMs};

/// Aligned auxiliary value for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedAux {
    /// Matched value, 0 when nothing matched.
    pub value: f64,
    /// Change against the last non-zero value of an earlier period.
    pub change_pct: f64,
}

/// Nearest-timestamp aligner.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aligner {
    /// Points farther than this from the target are ignored.
    max_distance_ms: Option<i64>,
}

impl Aligner {
    /// Create an aligner. `None` matches arbitrarily distant points.
    pub fn new(max_distance_ms: Option<i64>) -> Self {
        Self { max_distance_ms }
    }

    /// Point of `series` nearest to `ts_ms`; on a tie the earlier point wins.
    pub fn nearest(&self, series: &AuxSeries, ts_ms: TimestampMs) -> Option<AuxPoint> {
        let before = series.at_or_before(ts_ms);
        let after = series.at_or_after(ts_ms);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if ts_ms.abs_diff(b.ts_ms) <= ts_ms.abs_diff(a.ts_ms) {
                    b
                } else {
                    a
                }
            }
            (Some(p), None) | (None, Some(p)) => p,
            (None, None) => return None,
        };

        match self.max_distance_ms {
            Some(max) if ts_ms.abs_diff(best.ts_ms) > max.unsigned_abs() => None,
            _ => Some(best),
        }
    }

    /// Aligned value per timestamp, 0 where nothing matched.
    pub fn align_values(&self, timestamps: &[TimestampMs], series: &AuxSeries) -> Vec<f64> {
        timestamps
            .iter()
            .map(|&ts| self.nearest(series, ts).map_or(0.0, |p| p.value))
            .collect()
    }

    /// Aligned value and change percent per timestamp.
    pub fn align_with_change(
        &self,
        timestamps: &[TimestampMs],
        series: &AuxSeries,
    ) -> Vec<AlignedAux> {
        let values = self.align_values(timestamps, series);
        let changes = change_pcts(&values);
        values
            .into_iter()
            .zip(changes)
            .map(|(value, change_pct)| AlignedAux { value, change_pct })
            .collect()
    }

    /// Aligned ratio per timestamp, `None` where nothing matched.
    pub fn align_ratios(
        &self,
        timestamps: &[TimestampMs],
        series: &AuxSeries,
    ) -> Vec<Option<f64>> {
        timestamps
            .iter()
            .map(|&ts| self.nearest(series, ts).map(|p| p.value))
            .collect()
    }
}

/// Period-over-period change of aligned values.
///
/// Each value is compared against the most recent earlier non-zero value.
/// A zero current value, or no earlier non-zero value, yields 0.
pub fn change_pcts(values: &[f64]) -> Vec<f64> {
    let (_, changes) = values.iter().fold(
        (None::<f64>, Vec::with_capacity(values.len())),
        |(prev_nonzero, mut changes), &current| {
            let change = match prev_nonzero {
                Some(prev) if current != 0.0 => (current - prev) / prev * 100.0,
                _ => 0.0,
            };
            changes.push(change);
            let next = if current != 0.0 {
                Some(current)
            } else {
                prev_nonzero
            };
            (next, changes)
        },
    );
    changes
}
