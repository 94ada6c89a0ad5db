//! Configuration structures for the flowphase system.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Granularity;

/// Main configuration for a multi-timeframe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument configuration.
    pub instrument: InstrumentConfig,
    /// Provider fetch configuration.
    pub fetch: FetchConfig,
    /// Cross-series alignment configuration.
    pub alignment: AlignmentConfig,
    /// Multi-period rhythm configuration.
    pub rhythm: RhythmConfig,
    /// Timeframes to analyse.
    pub timeframes: Vec<TimeframeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instrument: InstrumentConfig::default(),
            fetch: FetchConfig::default(),
            alignment: AlignmentConfig::default(),
            rhythm: RhythmConfig::default(),
            timeframes: TimeframeConfig::defaults(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.instrument.symbol.trim().is_empty() {
            return Err(Error::config("instrument.symbol must not be empty"));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(Error::config("fetch.timeout_ms must be positive"));
        }
        if matches!(self.alignment.max_distance_ms, Some(d) if d < 0) {
            return Err(Error::config("alignment.max_distance_ms must not be negative"));
        }
        if self.rhythm.window == 0 {
            return Err(Error::config("rhythm.window must be positive"));
        }
        if self.timeframes.is_empty() {
            return Err(Error::config("at least one timeframe is required"));
        }

        let mut seen = HashSet::new();
        for tf in &self.timeframes {
            if tf.samples_per_period == 0 {
                return Err(Error::config(format!(
                    "timeframe {}: samples_per_period must be positive",
                    tf.granularity
                )));
            }
            if tf.lookback == 0 {
                return Err(Error::config(format!(
                    "timeframe {}: lookback must be positive",
                    tf.granularity
                )));
            }
            if !seen.insert(tf.granularity) {
                return Err(Error::config(format!(
                    "timeframe {} configured twice",
                    tf.granularity
                )));
            }
        }
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Trading symbol (e.g., "BTCUSDT").
    pub symbol: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
        }
    }
}

/// Provider fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on a single provider call (ms).
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Cross-series alignment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Maximum distance (ms) between a period start and the matched auxiliary
    /// point. `None` matches arbitrarily distant points.
    pub max_distance_ms: Option<i64>,
}

/// Multi-period rhythm (divergence) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Number of most recent periods inspected.
    pub window: usize,
    /// Summed price change (%) that marks a major divergence.
    pub divergence_price_pct: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            window: 4,
            divergence_price_pct: 5.0,
        }
    }
}

/// One analysed timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeConfig {
    /// Period length reported for this timeframe.
    pub granularity: Granularity,
    /// Interval of the samples requested from the provider.
    pub source_interval: Granularity,
    /// Samples aggregated into one period.
    pub samples_per_period: usize,
    /// Number of periods to produce.
    pub lookback: usize,
}

impl TimeframeConfig {
    pub fn new(
        granularity: Granularity,
        source_interval: Granularity,
        samples_per_period: usize,
        lookback: usize,
    ) -> Self {
        Self {
            granularity,
            source_interval,
            samples_per_period,
            lookback,
        }
    }

    /// Number of samples to request from the provider.
    pub fn sample_count(&self) -> usize {
        self.samples_per_period.saturating_mul(self.lookback)
    }

    /// Default timeframe set, 15-minute through monthly.
    pub fn defaults() -> Vec<TimeframeConfig> {
        vec![
            TimeframeConfig::new(Granularity::M15, Granularity::M5, 3, 24),
            TimeframeConfig::new(Granularity::H1, Granularity::M15, 4, 24),
            TimeframeConfig::new(Granularity::H4, Granularity::H1, 4, 30),
            TimeframeConfig::new(Granularity::D1, Granularity::H4, 6, 30),
            TimeframeConfig::new(Granularity::W1, Granularity::H4, 42, 12),
            TimeframeConfig::new(Granularity::Mo1, Granularity::D1, 30, 12),
        ]
    }
}
