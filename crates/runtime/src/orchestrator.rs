//! Multi-timeframe orchestrator.
//!
//! Runs the period pipeline once per configured timeframe, each on its own
//! tokio task, and gathers the results into a [`MarketReport`].

use chrono::Utc;
use flowphase_core::{
    AuxKind, AuxSeries, Config, FetchError, Granularity, Result, TimeframeConfig,
};
use flowphase_features::{AuxInputs, PeriodEngine};
use flowphase_ingestion::{AuxSeriesProvider, FetchResult, SampleProvider};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::report::{MarketReport, TimeframeReport};

/// Runs every configured timeframe concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    samples: Arc<dyn SampleProvider>,
    aux: Arc<dyn AuxSeriesProvider>,
    config: Arc<Config>,
}

impl Orchestrator {
    /// Create an orchestrator. The configuration is validated first.
    pub fn new(
        samples: Arc<dyn SampleProvider>,
        aux: Arc<dyn AuxSeriesProvider>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            samples,
            aux,
            config: Arc::new(config),
        })
    }

    /// Create an orchestrator whose provider serves both samples and
    /// auxiliary series.
    pub fn with_provider<P>(provider: Arc<P>, config: Config) -> Result<Self>
    where
        P: SampleProvider + AuxSeriesProvider + 'static,
    {
        Self::new(provider.clone(), provider, config)
    }

    /// Run all timeframes and wait for every one to finish or fail.
    pub async fn run(&self) -> MarketReport {
        let handles: Vec<(Granularity, JoinHandle<TimeframeReport>)> = self
            .config
            .timeframes
            .iter()
            .map(|timeframe| {
                let job = TimeframeJob {
                    samples: Arc::clone(&self.samples),
                    aux: Arc::clone(&self.aux),
                    config: Arc::clone(&self.config),
                    timeframe: timeframe.clone(),
                };
                (timeframe.granularity, tokio::spawn(job.run()))
            })
            .collect();

        let mut timeframes = BTreeMap::new();
        for (granularity, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("{} task did not complete: {}", granularity, e);
                    TimeframeReport::task_failed(granularity, e.to_string())
                }
            };
            timeframes.insert(granularity, report);
        }

        let report = MarketReport {
            symbol: self.config.instrument.symbol.clone(),
            generated_at: Utc::now(),
            timeframes,
        };
        info!(
            "{}: {}/{} timeframes ok",
            report.symbol,
            report.ok_count(),
            report.timeframes.len()
        );
        report
    }
}

/// Pipeline inputs for one timeframe, owned by its task.
struct TimeframeJob {
    samples: Arc<dyn SampleProvider>,
    aux: Arc<dyn AuxSeriesProvider>,
    config: Arc<Config>,
    timeframe: TimeframeConfig,
}

impl TimeframeJob {
    async fn run(self) -> TimeframeReport {
        let symbol = self.config.instrument.symbol.as_str();
        let tf = &self.timeframe;
        let timeout_ms = self.config.fetch.timeout_ms;
        let count = tf.sample_count();

        let (samples, open_interest, whale_ratio, retail_ratio) = tokio::join!(
            with_timeout(
                timeout_ms,
                self.samples.fetch_samples(symbol, tf.source_interval, count)
            ),
            self.fetch_aux(AuxKind::OpenInterest),
            self.fetch_aux(AuxKind::WhaleLongShortRatio),
            self.fetch_aux(AuxKind::RetailLongShortRatio),
        );

        let samples = match samples {
            Ok(samples) => samples,
            Err(e) => {
                warn!("{} {}: sample fetch failed: {}", symbol, tf.granularity, e);
                return TimeframeReport::fetch_failed(tf.granularity, e);
            }
        };

        let mut aux_warnings = Vec::new();
        let inputs = AuxInputs {
            open_interest: aux_or_empty(AuxKind::OpenInterest, open_interest, &mut aux_warnings),
            whale_ratio: aux_or_empty(AuxKind::WhaleLongShortRatio, whale_ratio, &mut aux_warnings),
            retail_ratio: aux_or_empty(
                AuxKind::RetailLongShortRatio,
                retail_ratio,
                &mut aux_warnings,
            ),
        };
        for warning in &aux_warnings {
            warn!("{} {}: {}", symbol, tf.granularity, warning);
        }

        let output = PeriodEngine::from_config(tf, &self.config).run(&samples, inputs);
        let report = TimeframeReport::from_output(tf.granularity, output, &self.config.rhythm)
            .with_aux_warnings(aux_warnings);

        info!(
            "{} {}: {} periods from {} samples ({:?})",
            symbol,
            tf.granularity,
            report.rows.len(),
            samples.len(),
            report.status
        );
        report
    }

    async fn fetch_aux(&self, kind: AuxKind) -> FetchResult<AuxSeries> {
        let tf = &self.timeframe;
        with_timeout(
            self.config.fetch.timeout_ms,
            self.aux.fetch_aux(
                &self.config.instrument.symbol,
                kind,
                tf.source_interval,
                tf.sample_count(),
            ),
        )
        .await
    }
}

/// Bound a fetch by `timeout_ms`.
async fn with_timeout<T>(
    timeout_ms: u64,
    fetch: impl Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout_ms)),
    }
}

fn aux_or_empty(
    kind: AuxKind,
    result: FetchResult<AuxSeries>,
    warnings: &mut Vec<String>,
) -> AuxSeries {
    result.unwrap_or_else(|e| {
        warnings.push(format!("{kind} unavailable, treated as empty: {e}"));
        AuxSeries::default()
    })
}
