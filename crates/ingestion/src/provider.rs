//! Provider interfaces for market data.
//!
//! Transport is out of scope here: an HTTP client, a file reader or the
//! in-memory snapshot all plug in behind these traits.

use async_trait::async_trait;
use flowphase_core::{AuxKind, AuxSeries, FetchError, Granularity, Sample};

/// Result of a provider call.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Source of price/volume samples.
#[async_trait]
pub trait SampleProvider: Send + Sync {
    /// Fetch the most recent `count` samples of `interval` for `symbol`,
    /// ascending by timestamp. An empty vector means no data.
    async fn fetch_samples(
        &self,
        symbol: &str,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<Vec<Sample>>;
}

/// Source of auxiliary series (open interest, long/short ratios).
#[async_trait]
pub trait AuxSeriesProvider: Send + Sync {
    /// Fetch up to `count` points of `kind` at `interval` for `symbol`.
    /// The series may be sparser than the sample series.
    async fn fetch_aux(
        &self,
        symbol: &str,
        kind: AuxKind,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<AuxSeries>;
}
