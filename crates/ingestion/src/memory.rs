//! In-memory provider backed by market snapshots.
//!
//! Serves pre-recorded samples and auxiliary series, e.g. loaded from a JSON
//! file. Failures and latency can be injected per interval.

use async_trait::async_trait;
use flowphase_core::{AuxKind, AuxSeries, FetchError, Granularity, Sample};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::provider::{AuxSeriesProvider, FetchResult, SampleProvider};

/// Recorded market data for one symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    /// Trading symbol.
    pub symbol: String,
    /// Samples by interval, ascending by timestamp.
    pub samples: BTreeMap<Granularity, Vec<Sample>>,
    /// Auxiliary series by interval and kind.
    pub aux: BTreeMap<Granularity, HashMap<AuxKind, AuxSeries>>,
}

impl MarketSnapshot {
    /// Parse a snapshot from JSON.
    pub fn from_json_str(json: &str) -> flowphase_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file.
    pub fn from_json_file(path: impl AsRef<Path>) -> flowphase_core::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Provider serving snapshots from memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    snapshots: HashMap<String, MarketSnapshot>,
    sample_failures: HashMap<(String, Granularity), FetchError>,
    latency: Option<Duration>,
}

impl InMemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider serving a single snapshot.
    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        let mut provider = Self::new();
        provider.add_snapshot(snapshot);
        provider
    }

    /// Register (or replace) the snapshot for its symbol.
    pub fn add_snapshot(&mut self, snapshot: MarketSnapshot) {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
    }

    /// Set samples for a symbol and interval.
    pub fn insert_samples(&mut self, symbol: &str, interval: Granularity, samples: Vec<Sample>) {
        self.snapshot_mut(symbol).samples.insert(interval, samples);
    }

    /// Set an auxiliary series for a symbol and interval.
    pub fn insert_aux(
        &mut self,
        symbol: &str,
        kind: AuxKind,
        interval: Granularity,
        series: AuxSeries,
    ) {
        self.snapshot_mut(symbol)
            .aux
            .entry(interval)
            .or_default()
            .insert(kind, series);
    }

    /// Make sample fetches for a symbol and interval fail with `error`.
    pub fn fail_samples(&mut self, symbol: &str, interval: Granularity, error: FetchError) {
        self.sample_failures
            .insert((symbol.to_string(), interval), error);
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn snapshot_mut(&mut self, symbol: &str) -> &mut MarketSnapshot {
        self.snapshots
            .entry(symbol.to_string())
            .or_insert_with(|| MarketSnapshot {
                symbol: symbol.to_string(),
                ..MarketSnapshot::default()
            })
    }

    fn snapshot(&self, symbol: &str) -> FetchResult<&MarketSnapshot> {
        self.snapshots
            .get(symbol)
            .ok_or_else(|| FetchError::unavailable(format!("unknown symbol {symbol}")))
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SampleProvider for InMemoryProvider {
    async fn fetch_samples(
        &self,
        symbol: &str,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<Vec<Sample>> {
        self.simulate_latency().await;

        if let Some(err) = self.sample_failures.get(&(symbol.to_string(), interval)) {
            return Err(err.clone());
        }

        let samples = self
            .snapshot(symbol)?
            .samples
            .get(&interval)
            .map(Vec::as_slice)
            .unwrap_or_default();

        // Like an exchange `limit`, return the most recent `count`
        let start = samples.len().saturating_sub(count);
        Ok(samples[start..].to_vec())
    }
}

#[async_trait]
impl AuxSeriesProvider for InMemoryProvider {
    async fn fetch_aux(
        &self,
        symbol: &str,
        kind: AuxKind,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<AuxSeries> {
        self.simulate_latency().await;

        let series = self
            .snapshot(symbol)?
            .aux
            .get(&interval)
            .and_then(|by_kind| by_kind.get(&kind));

        Ok(match series {
            Some(series) => {
                let skip = series.len().saturating_sub(count);
                AuxSeries::new(series.iter().skip(skip))
            }
            None => AuxSeries::default(),
        })
    }
}
