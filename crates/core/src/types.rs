//! Core data types for the flowphase system.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Convert a millisecond timestamp to a UTC datetime.
///
/// Out-of-range timestamps map to the Unix epoch.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts_ms).single().unwrap_or_default()
}

/// Time granularity of a period (and of the source samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mo1,
}

impl Granularity {
    /// All granularities, shortest first.
    pub const ALL: [Granularity; 8] = [
        Granularity::M1,
        Granularity::M5,
        Granularity::M15,
        Granularity::H1,
        Granularity::H4,
        Granularity::D1,
        Granularity::W1,
        Granularity::Mo1,
    ];

    /// Exchange-style interval label.
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::M1 => "1m",
            Granularity::M5 => "5m",
            Granularity::M15 => "15m",
            Granularity::H1 => "1h",
            Granularity::H4 => "4h",
            Granularity::D1 => "1d",
            Granularity::W1 => "1w",
            Granularity::Mo1 => "1M",
        }
    }

    /// Nominal duration in milliseconds (a month counts as 30 days).
    pub fn duration_ms(self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Granularity::M1 => MINUTE,
            Granularity::M5 => 5 * MINUTE,
            Granularity::M15 => 15 * MINUTE,
            Granularity::H1 => 60 * MINUTE,
            Granularity::H4 => 240 * MINUTE,
            Granularity::D1 => 1_440 * MINUTE,
            Granularity::W1 => 7 * 1_440 * MINUTE,
            Granularity::Mo1 => 30 * 1_440 * MINUTE,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::config(format!("unknown granularity '{s}'")))
    }
}

/// One raw exchange data point (a kline).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Open timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Open price.
    pub open: f64,
    /// Close price.
    pub close: f64,
    /// Total traded volume (quote notional).
    pub volume: f64,
    /// Volume where the buyer was the aggressor.
    pub taker_buy_volume: f64,
}

impl Sample {
    /// Aggressor-buy volume.
    #[inline]
    pub fn buy_volume(&self) -> f64 {
        self.taker_buy_volume
    }

    /// Aggressor-sell volume. Not clamped: malformed upstream data may make it negative.
    #[inline]
    pub fn sell_volume(&self) -> f64 {
        self.volume - self.taker_buy_volume
    }

    /// Net aggressor volume (buy - sell).
    #[inline]
    pub fn delta(&self) -> f64 {
        self.buy_volume() - self.sell_volume()
    }

    /// Reject samples carrying NaN or infinite fields.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("close", self.close),
            ("volume", self.volume),
            ("taker_buy_volume", self.taker_buy_volume),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, v)) => Err(Error::data(format!(
                "sample at {} has non-finite {name} ({v})",
                self.ts_ms
            ))),
            None => Ok(()),
        }
    }
}

/// A single point of an auxiliary series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxPoint {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Open interest notional or long/short ratio.
    pub value: f64,
}

/// Which auxiliary series a provider is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxKind {
    /// Open interest notional.
    OpenInterest,
    /// Long/short ratio of the largest accounts.
    WhaleLongShortRatio,
    /// Long/short ratio across all accounts.
    RetailLongShortRatio,
}

impl AuxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuxKind::OpenInterest => "open_interest",
            AuxKind::WhaleLongShortRatio => "whale_long_short_ratio",
            AuxKind::RetailLongShortRatio => "retail_long_short_ratio",
        }
    }
}

impl fmt::Display for AuxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered timestamp -> value mapping with unique keys.
///
/// Serialized as a list of points; on duplicate timestamps the later point wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<AuxPoint>", into = "Vec<AuxPoint>")]
pub struct AuxSeries {
    points: BTreeMap<TimestampMs, f64>,
}

impl AuxSeries {
    /// Build a series from points in any order.
    pub fn new(points: impl IntoIterator<Item = AuxPoint>) -> Self {
        Self {
            points: points.into_iter().map(|p| (p.ts_ms, p.value)).collect(),
        }
    }

    /// Build a series from `(timestamp, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (TimestampMs, f64)>) -> Self {
        Self {
            points: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Value stored at exactly `ts_ms`.
    pub fn get(&self, ts_ms: TimestampMs) -> Option<f64> {
        self.points.get(&ts_ms).copied()
    }

    /// Latest point at or before `ts_ms`.
    pub fn at_or_before(&self, ts_ms: TimestampMs) -> Option<AuxPoint> {
        self.points
            .range(..=ts_ms)
            .next_back()
            .map(|(&ts_ms, &value)| AuxPoint { ts_ms, value })
    }

    /// Earliest point at or after `ts_ms`.
    pub fn at_or_after(&self, ts_ms: TimestampMs) -> Option<AuxPoint> {
        self.points
            .range(ts_ms..)
            .next()
            .map(|(&ts_ms, &value)| AuxPoint { ts_ms, value })
    }

    /// Iterate points in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = AuxPoint> + '_ {
        self.points
            .iter()
            .map(|(&ts_ms, &value)| AuxPoint { ts_ms, value })
    }

    /// Drop points whose value is NaN or infinite. Returns how many were removed.
    pub fn retain_finite(&mut self) -> usize {
        let before = self.points.len();
        self.points.retain(|_, v| v.is_finite());
        before - self.points.len()
    }
}

impl From<Vec<AuxPoint>> for AuxSeries {
    fn from(points: Vec<AuxPoint>) -> Self {
        AuxSeries::new(points)
    }
}

impl From<AuxSeries> for Vec<AuxPoint> {
    fn from(series: AuxSeries) -> Self {
        series.iter().collect()
    }
}

/// An aggregated window of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Timestamp of the first member sample.
    pub start_ts: TimestampMs,
    /// Timestamp of the last member sample.
    pub end_ts: TimestampMs,
    /// Number of member samples.
    pub sample_count: usize,
    /// Open of the first member sample.
    pub open: f64,
    /// Close of the last member sample.
    pub close: f64,
    /// (close - open) / open * 100, or 0 when open is 0.
    pub price_change_pct: f64,
    /// Sum of aggressor-buy volume.
    pub buy_volume: f64,
    /// Sum of aggressor-sell volume.
    pub sell_volume: f64,
    /// buy_volume - sell_volume.
    pub net_flow: f64,
    /// Aligned open interest (0 = no data).
    pub aux_value: f64,
    /// Change of `aux_value` against the last non-zero aligned value.
    pub aux_change_pct: f64,
    /// Aligned whale long/short ratio, if that series was available.
    pub whale_ratio: Option<f64>,
    /// Aligned retail long/short ratio, if that series was available.
    pub retail_ratio: Option<f64>,
}

impl Period {
    pub fn start_time(&self) -> DateTime<Utc> {
        ts_to_datetime(self.start_ts)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        ts_to_datetime(self.end_ts)
    }

    /// Net flow relative to total volume, in [-1, 1] for well-formed data.
    pub fn flow_ratio(&self) -> f64 {
        let total = self.buy_volume + self.sell_volume;
        if total != 0.0 {
            self.net_flow / total
        } else {
            0.0
        }
    }
}

/// Severity tag of a signal. Presentation layers map these to styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// High-conviction buying opportunity.
    Opportunity,
    /// Constructive, supportive conditions.
    Bullish,
    /// No directional information.
    Neutral,
    /// Mixed or early; wait for confirmation.
    Caution,
    /// Deteriorating conditions.
    Bearish,
    /// Maximal warning.
    Critical,
}

/// Branch of the classifier cascade that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    // Parabolic guard
    ParabolicBackedRally,
    ParabolicFakePump,
    ParabolicPump,
    ParabolicCapitulationEntry,
    ParabolicCapitulationWait,
    // Extreme retail positioning
    FomoPeakFakePump,
    FomoPeak,
    FomoExtremeWarning,
    // Elevated retail positioning
    RallyFomoTop,
    RallyFomo,
    BreakdownFomoLate,
    BreakdownFomoActive,
    DeclineFomo,
    SidewaysFomo,
    RetailLongsSupported,
    // Whale / price divergence
    WhaleAccumulationHighConviction,
    WhaleAccumulationConfirmed,
    WhaleAccumulationEarly,
    WhaleDistribution,
    // Retail contrarian
    RetailCapitulationBuyZone,
    RetailCapitulationSupported,
    RetailCapitulationEarly,
    // Strong confirmation
    ConfirmedUptrend,
    ConfirmedDump,
    // Absorption / trap
    Absorption,
    WeakRallyTrap,
    // Moderate moves
    HealthyUptrend,
    WeakUptrend,
    DipAbsorbed,
    AggressiveSelling,
    Neutral,
}

impl SignalKind {
    /// Short human-readable label.
    pub fn headline(self) -> &'static str {
        match self {
            SignalKind::ParabolicBackedRally => "Parabolic rally backed by flow",
            SignalKind::ParabolicFakePump => "Fake pump",
            SignalKind::ParabolicPump => "Parabolic pump",
            SignalKind::ParabolicCapitulationEntry => "Capitulation, consider staged entry",
            SignalKind::ParabolicCapitulationWait => "Capitulation, too early, wait",
            SignalKind::FomoPeakFakePump => "Fake pump + FOMO peak",
            SignalKind::FomoPeak => "FOMO peak",
            SignalKind::FomoExtremeWarning => "FOMO extreme warning",
            SignalKind::RallyFomoTop => "Rally FOMO, late stage",
            SignalKind::RallyFomo => "Rally FOMO",
            SignalKind::BreakdownFomoLate => "Breakdown with crowded longs, late",
            SignalKind::BreakdownFomoActive => "Breakdown with crowded longs",
            SignalKind::DeclineFomo => "Decline with crowded longs",
            SignalKind::SidewaysFomo => "Sideways with crowded longs",
            SignalKind::RetailLongsSupported => "Crowded longs, flow supportive",
            SignalKind::WhaleAccumulationHighConviction => "Whale accumulation, high conviction",
            SignalKind::WhaleAccumulationConfirmed => "Whale accumulation, confirmed",
            SignalKind::WhaleAccumulationEarly => "Whale accumulation, early, wait for confirmation",
            SignalKind::WhaleDistribution => "Whale distribution",
            SignalKind::RetailCapitulationBuyZone => "Retail capitulation, high conviction buy zone",
            SignalKind::RetailCapitulationSupported => "Retail capitulation, supported, consider entry",
            SignalKind::RetailCapitulationEarly => {
                "Retail capitulation, early, wait for flow confirmation"
            }
            SignalKind::ConfirmedUptrend => "Confirmed uptrend",
            SignalKind::ConfirmedDump => "Confirmed dump",
            SignalKind::Absorption => "Absorption, possible reversal",
            SignalKind::WeakRallyTrap => "Weak rally / trap",
            SignalKind::HealthyUptrend => "Healthy move up",
            SignalKind::WeakUptrend => "Weak move up",
            SignalKind::DipAbsorbed => "Dip absorbed",
            SignalKind::AggressiveSelling => "Aggressive selling",
            SignalKind::Neutral => "Neutral, no directional signal",
        }
    }
}

/// Classifier output attached to one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub headline: String,
    pub explanation: String,
    pub severity: Severity,
}

/// Coarse market phase of a period, judged from flow against price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    /// Buying into a falling price.
    Absorption,
    /// Buying with a rising price.
    Markup,
    /// Selling into a rising price.
    Distribution,
    /// Selling with a falling price.
    Capitulation,
    /// Net buying without a clear price move.
    Accumulation,
    Neutral,
}

/// Verdict of the multi-period rhythm check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmVerdict {
    /// Not enough periods for the window.
    InsufficientData,
    /// Price down while net flow is positive.
    MajorBullishDivergence,
    /// Price up while net flow is negative.
    MajorBearishDivergence,
    HealthyAccumulation,
    Weakness,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample(volume: f64, taker_buy_volume: f64) -> Sample {
        Sample {
            ts_ms: 0,
            open: 100.0,
            close: 101.0,
            volume,
            taker_buy_volume,
        }
    }

    #[test]
    fn test_sample_delta() {
        let s = sample(10.0, 7.0);
        assert_abs_diff_eq!(s.buy_volume(), 7.0);
        assert_abs_diff_eq!(s.sell_volume(), 3.0);
        assert_abs_diff_eq!(s.delta(), 4.0);
    }

    #[test]
    fn test_negative_sell_passes_through() {
        // Taker buy above total volume is malformed but not clamped
        let s = sample(10.0, 12.0);
        assert_abs_diff_eq!(s.sell_volume(), -2.0);
        assert_abs_diff_eq!(s.delta(), 14.0);
    }

    #[test]
    fn test_sample_validate() {
        assert!(sample(10.0, 5.0).validate().is_ok());
        assert!(sample(f64::NAN, 5.0).validate().is_err());
        assert!(sample(10.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_granularity_round_trip_label() {
        for g in Granularity::ALL {
            assert_eq!(g.as_str().parse::<Granularity>().unwrap(), g);
        }
        assert!("2h".parse::<Granularity>().is_err());
        assert_eq!(serde_json::to_string(&Granularity::Mo1).unwrap(), "\"1M\"");
    }

    #[test]
    fn test_granularity_order() {
        assert!(Granularity::M15 < Granularity::H1);
        assert!(Granularity::W1 < Granularity::Mo1);
    }

    #[test]
    fn test_aux_series_dedup_and_lookup() {
        let series = AuxSeries::new(vec![
            AuxPoint { ts_ms: 300, value: 3.0 },
            AuxPoint { ts_ms: 100, value: 1.0 },
            AuxPoint { ts_ms: 100, value: 1.5 },
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(100), Some(1.5));
        assert_eq!(series.at_or_before(250).map(|p| p.ts_ms), Some(100));
        assert_eq!(series.at_or_after(250).map(|p| p.ts_ms), Some(300));
        assert!(series.at_or_before(50).is_none());
        assert!(series.at_or_after(301).is_none());
    }

    #[test]
    fn test_aux_series_json_is_point_list() {
        let json = r#"[{"ts_ms": 2, "value": 4.0}, {"ts_ms": 1, "value": 3.0}]"#;
        let series: AuxSeries = serde_json::from_str(json).unwrap();
        let points: Vec<AuxPoint> = series.iter().collect();
        assert_eq!(points[0].ts_ms, 1);
        assert_eq!(points[1].ts_ms, 2);
    }

    #[test]
    fn test_retain_finite() {
        let mut series = AuxSeries::from_pairs(vec![(1, 1.0), (2, f64::NAN), (3, f64::NEG_INFINITY)]);
        assert_eq!(series.retain_finite(), 2);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_flow_ratio_zero_volume() {
        let period = Period {
            start_ts: 0,
            end_ts: 0,
            sample_count: 0,
            open: 0.0,
            close: 0.0,
            price_change_pct: 0.0,
            buy_volume: 0.0,
            sell_volume: 0.0,
            net_flow: 0.0,
            aux_value: 0.0,
            aux_change_pct: 0.0,
            whale_ratio: None,
            retail_ratio: None,
        };
        assert_eq!(period.flow_ratio(), 0.0);
    }
}
