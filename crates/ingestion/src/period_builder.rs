//! Period building from ordered samples.
//!
//! Groups uniform-interval samples into consecutive windows of a fixed
//! sample count and derives the price change of each window.

use flowphase_core::{Sample, TimestampMs};
use std::ops::Range;

/// Price summary of one window of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBar {
    /// Timestamp of the first member sample.
    pub start_ts: TimestampMs,
    /// Timestamp of the last member sample.
    pub end_ts: TimestampMs,
    /// Open of the first member sample.
    pub open: f64,
    /// Close of the last member sample.
    pub close: f64,
    /// (close - open) / open * 100, or 0 when open is 0.
    pub price_change_pct: f64,
    /// Indices of the member samples in the input slice.
    pub members: Range<usize>,
}

impl PeriodBar {
    /// Number of member samples.
    pub fn sample_count(&self) -> usize {
        self.members.len()
    }
}

/// Percentage change from `open` to `close`. A zero open yields 0.
#[inline]
pub fn price_change_pct(open: f64, close: f64) -> f64 {
    if open != 0.0 {
        (close - open) / open * 100.0
    } else {
        0.0
    }
}

/// A window that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    first_index: usize,
    start_ts: TimestampMs,
    end_ts: TimestampMs,
    open: Option<f64>,
    close: f64,
    count: usize,
}

impl BarInProgress {
    fn new(first_index: usize) -> Self {
        Self {
            first_index,
            start_ts: 0,
            end_ts: 0,
            open: None,
            close: 0.0,
            count: 0,
        }
    }

    fn add_sample(&mut self, sample: &Sample) {
        if self.open.is_none() {
            self.open = Some(sample.open);
            self.start_ts = sample.ts_ms;
        }
        self.end_ts = sample.ts_ms;
        self.close = sample.close;
        self.count += 1;
    }

    fn to_bar(&self) -> PeriodBar {
        // An empty window still produces a bar, flat at zero
        let open = self.open.unwrap_or(0.0);
        PeriodBar {
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            open,
            close: self.close,
            price_change_pct: price_change_pct(open, self.close),
            members: self.first_index..self.first_index + self.count,
        }
    }
}

/// Builder for fixed-size periods from ordered samples.
#[derive(Debug, Clone, Copy)]
pub struct PeriodBuilder {
    window: usize,
}

impl PeriodBuilder {
    /// Create a builder grouping `window` samples per period.
    ///
    /// A window of 0 is treated as 1.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Samples per period.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Build periods over all samples, oldest first.
    ///
    /// The last period may hold fewer than `window` samples.
    pub fn build(&self, samples: &[Sample]) -> Vec<PeriodBar> {
        self.build_from(samples, 0)
    }

    /// Build at most `lookback` periods from the most recent
    /// `lookback * window` samples. Member ranges index into `samples`.
    pub fn build_recent(&self, samples: &[Sample], lookback: usize) -> Vec<PeriodBar> {
        let keep = self.window.saturating_mul(lookback);
        let offset = samples.len().saturating_sub(keep);
        self.build_from(&samples[offset..], offset)
    }

    fn build_from(&self, samples: &[Sample], offset: usize) -> Vec<PeriodBar> {
        samples
            .chunks(self.window)
            .enumerate()
            .map(|(i, chunk)| {
                let mut bar = BarInProgress::new(offset + i * self.window);
                for sample in chunk {
                    bar.add_sample(sample);
                }
                bar.to_bar()
            })
            .collect()
    }
}
