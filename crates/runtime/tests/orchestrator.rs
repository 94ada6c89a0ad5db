use async_trait::async_trait;
use flowphase_core::{
    AuxKind, AuxSeries, Config, FetchError, Granularity, Sample, SignalKind, TimeframeConfig,
};
use flowphase_ingestion::{
    AuxSeriesProvider, FetchResult, InMemoryProvider, MarketSnapshot, SampleProvider,
};
use flowphase_runtime::{Orchestrator, TimeframeStatus};
use std::sync::Arc;
use std::time::Duration;

const SYMBOL: &str = "BTCUSDT";
const M15: i64 = 15 * 60 * 1000;

fn make_samples(n: i64, step_ms: i64) -> Vec<Sample> {
    (0..n)
        .map(|i| Sample {
            ts_ms: i * step_ms,
            open: 100.0,
            close: 100.0,
            volume: 2_000_000.0,
            taker_buy_volume: 2_000_000.0,
        })
        .collect()
}

fn two_timeframes() -> Config {
    Config {
        timeframes: vec![
            TimeframeConfig::new(Granularity::H1, Granularity::M15, 4, 3),
            TimeframeConfig::new(Granularity::H4, Granularity::H1, 4, 3),
        ],
        ..Config::default()
    }
}

fn base_provider() -> InMemoryProvider {
    let mut provider = InMemoryProvider::new();
    provider.insert_samples(SYMBOL, Granularity::M15, make_samples(12, M15));
    provider.insert_samples(SYMBOL, Granularity::H1, make_samples(12, 4 * M15));
    provider
}

/// Wraps the in-memory provider with per-interval misbehaviour.
struct FaultyProvider {
    inner: InMemoryProvider,
    slow: Option<(Granularity, Duration)>,
    panics: Option<Granularity>,
    aux_failure: Option<AuxKind>,
}

impl FaultyProvider {
    fn new(inner: InMemoryProvider) -> Self {
        Self {
            inner,
            slow: None,
            panics: None,
            aux_failure: None,
        }
    }
}

#[async_trait]
impl SampleProvider for FaultyProvider {
    async fn fetch_samples(
        &self,
        symbol: &str,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<Vec<Sample>> {
        if let Some((slow, delay)) = self.slow {
            if slow == interval {
                tokio::time::sleep(delay).await;
            }
        }
        if self.panics == Some(interval) {
            panic!("provider crashed");
        }
        self.inner.fetch_samples(symbol, interval, count).await
    }
}

#[async_trait]
impl AuxSeriesProvider for FaultyProvider {
    async fn fetch_aux(
        &self,
        symbol: &str,
        kind: AuxKind,
        interval: Granularity,
        count: usize,
    ) -> FetchResult<AuxSeries> {
        if self.aux_failure == Some(kind) {
            return Err(FetchError::transient("status 503"));
        }
        self.inner.fetch_aux(symbol, kind, interval, count).await
    }
}

#[tokio::test]
async fn test_failed_timeframe_does_not_abort_others() {
    let mut provider = base_provider();
    provider.fail_samples(SYMBOL, Granularity::M15, FetchError::transient("status 502"));

    let report = Orchestrator::with_provider(Arc::new(provider), two_timeframes())
        .unwrap()
        .run()
        .await;

    assert_eq!(
        report.timeframe(Granularity::H1).unwrap().status,
        TimeframeStatus::FetchFailed(FetchError::transient("status 502"))
    );
    let h4 = report.timeframe(Granularity::H4).unwrap();
    assert_eq!(h4.status, TimeframeStatus::Ok);
    assert_eq!(h4.rows.len(), 3);
}

#[tokio::test]
async fn test_timeout_reported_as_failure() {
    let mut provider = FaultyProvider::new(base_provider());
    provider.slow = Some((Granularity::H1, Duration::from_secs(5)));
    let mut config = two_timeframes();
    config.fetch.timeout_ms = 50;

    let report = Orchestrator::with_provider(Arc::new(provider), config)
        .unwrap()
        .run()
        .await;

    assert_eq!(
        report.timeframe(Granularity::H4).unwrap().status,
        TimeframeStatus::FetchFailed(FetchError::Timeout(50))
    );
    assert!(report.timeframe(Granularity::H1).unwrap().is_ok());
}

#[tokio::test]
async fn test_panicked_task_isolated() {
    let mut provider = FaultyProvider::new(base_provider());
    provider.panics = Some(Granularity::M15);

    let report = Orchestrator::with_provider(Arc::new(provider), two_timeframes())
        .unwrap()
        .run()
        .await;

    assert!(matches!(
        report.timeframe(Granularity::H1).unwrap().status,
        TimeframeStatus::TaskFailed(_)
    ));
    assert!(report.timeframe(Granularity::H4).unwrap().is_ok());
}

#[tokio::test]
async fn test_aux_failure_falls_back_to_empty() {
    let mut inner = base_provider();
    inner.insert_aux(
        SYMBOL,
        AuxKind::OpenInterest,
        Granularity::H1,
        AuxSeries::from_pairs(vec![(0, 1_000.0)]),
    );
    let mut provider = FaultyProvider::new(inner);
    provider.aux_failure = Some(AuxKind::WhaleLongShortRatio);

    let report = Orchestrator::with_provider(Arc::new(provider), two_timeframes())
        .unwrap()
        .run()
        .await;

    let h4 = report.timeframe(Granularity::H4).unwrap();
    assert!(h4.is_ok());
    assert_eq!(h4.aux_warnings.len(), 1);
    assert!(h4.aux_warnings[0].contains("whale_long_short_ratio"));
    assert!(h4.rows.iter().all(|r| r.period.whale_ratio.is_none()));
    assert!(h4.rows.iter().all(|r| r.period.aux_value == 1_000.0));
}

#[tokio::test]
async fn test_empty_series_is_no_data() {
    let mut provider = base_provider();
    provider.insert_samples(SYMBOL, Granularity::H1, Vec::new());

    let report = Orchestrator::with_provider(Arc::new(provider), two_timeframes())
        .unwrap()
        .run()
        .await;

    let h4 = report.timeframe(Granularity::H4).unwrap();
    assert_eq!(h4.status, TimeframeStatus::NoData);
    assert!(h4.rows.is_empty());
    assert_eq!(h4.latest_close, 0.0);
}

#[tokio::test]
async fn test_rows_newest_first_and_classified() {
    let report = Orchestrator::with_provider(Arc::new(base_provider()), two_timeframes())
        .unwrap()
        .run()
        .await;

    let h1 = report.timeframe(Granularity::H1).unwrap();
    let starts: Vec<i64> = h1.rows.iter().map(|r| r.period.start_ts).collect();
    assert_eq!(starts, vec![8 * M15, 4 * M15, 0]);
    let offsets: Vec<i64> = h1.rows.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, -1, -2]);

    for row in &h1.rows {
        // Flat price with 8M of net buying
        assert_eq!(row.period.net_flow, 8_000_000.0);
        assert_eq!(row.signal.kind, SignalKind::Neutral);
    }
}

#[tokio::test]
async fn test_report_from_snapshot_serializes() {
    let json = r#"{
        "symbol": "ETHUSDT",
        "samples": {
            "1h": [
                {"ts_ms": 0, "open": 100.0, "close": 101.0, "volume": 10.0, "taker_buy_volume": 6.0},
                {"ts_ms": 3600000, "open": 101.0, "close": 99.0, "volume": 10.0, "taker_buy_volume": 3.0}
            ]
        }
    }"#;
    let snapshot = MarketSnapshot::from_json_str(json).unwrap();
    let mut config = Config {
        timeframes: vec![TimeframeConfig::new(Granularity::H4, Granularity::H1, 4, 1)],
        ..Config::default()
    };
    config.instrument.symbol = "ETHUSDT".to_string();

    let provider = Arc::new(InMemoryProvider::from_snapshot(snapshot));
    let report = Orchestrator::with_provider(provider, config)
        .unwrap()
        .run()
        .await;

    let h4 = report.timeframe(Granularity::H4).unwrap();
    assert_eq!(h4.rows.len(), 1);
    assert_eq!(h4.rows[0].period.sample_count, 2);
    assert_eq!(h4.latest_close, 99.0);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["symbol"], "ETHUSDT");
    assert_eq!(value["timeframes"]["4h"]["status"], "ok");
}

#[tokio::test(start_paused = true)]
async fn test_timeframes_run_concurrently() {
    let latency = Duration::from_secs(1);
    let mut provider = InMemoryProvider::new();
    provider.insert_samples(SYMBOL, Granularity::M5, make_samples(12, M15 / 3));
    provider.insert_samples(SYMBOL, Granularity::M15, make_samples(12, M15));
    provider.insert_samples(SYMBOL, Granularity::H1, make_samples(12, 4 * M15));
    let provider = provider.with_latency(latency);

    let config = Config {
        timeframes: vec![
            TimeframeConfig::new(Granularity::M15, Granularity::M5, 3, 4),
            TimeframeConfig::new(Granularity::H1, Granularity::M15, 4, 3),
            TimeframeConfig::new(Granularity::H4, Granularity::H1, 4, 3),
        ],
        ..Config::default()
    };

    let started = tokio::time::Instant::now();
    let report = Orchestrator::with_provider(Arc::new(provider), config)
        .unwrap()
        .run()
        .await;
    let elapsed = started.elapsed();

    assert_eq!(report.ok_count(), 3);
    // Three timeframes, four fetches each, all overlapping
    assert!(elapsed >= latency);
    assert!(elapsed < latency * 2, "elapsed {elapsed:?}");
}
