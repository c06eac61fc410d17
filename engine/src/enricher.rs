use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use launch_core::distribution::{bundled_holdings, distribute, top_n_concentration};
use launch_core::error::EnrichError;
use launch_core::{AnalysisRecord, DistributionReport, LaunchEvent};

use crate::config::MonitorConfig;
use crate::ports::{DevScreen, HolderSource, LaunchResolver, RecordSink, RiskOracle};
use crate::watcher::LaunchSignal;

/// Tunables the orchestrator threads through the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub top_holder_count: usize,
    pub bundle_threshold_pct: f64,
    pub risk_score_threshold: f64,
    pub branch_timeout: Duration,
    pub max_concurrent_events: usize,
}

impl From<&MonitorConfig> for AnalysisSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            top_holder_count: config.top_holder_count,
            bundle_threshold_pct: config.bundle_threshold_pct,
            risk_score_threshold: config.risk_score_threshold,
            branch_timeout: Duration::from_secs(config.branch_timeout_secs),
            max_concurrent_events: config.max_concurrent_events,
        }
    }
}

/// Lifecycle of one launch event. `Failed` is terminal but still
/// delivers the partial record: missing data is itself a signal worth
/// persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Detected,
    Enriching,
    Assembled,
    Delivered,
    Failed,
}

/// Per-launch orchestrator: resolves the signal, fans out the four
/// enrichment branches concurrently with individual failure
/// isolation, merges everything into one record and hands it to the
/// sink.
pub struct Enricher {
    resolver: Arc<dyn LaunchResolver>,
    holders: Arc<dyn HolderSource>,
    risk: Arc<dyn RiskOracle>,
    dev: Arc<dyn DevScreen>,
    sink: Arc<dyn RecordSink>,
    settings: AnalysisSettings,
    permits: Arc<Semaphore>,
}

impl Enricher {
    pub fn new(
        resolver: Arc<dyn LaunchResolver>,
        holders: Arc<dyn HolderSource>,
        risk: Arc<dyn RiskOracle>,
        dev: Arc<dyn DevScreen>,
        sink: Arc<dyn RecordSink>,
        settings: AnalysisSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_events));
        Self {
            resolver,
            holders,
            risk,
            dev,
            sink,
            settings,
            permits,
        }
    }

    /// Take one signal off the subscription without serializing
    /// against other in-flight events. Upstream concurrency stays
    /// bounded by the semaphore so a launch storm cannot trigger RPC
    /// throttling.
    pub fn spawn_analysis(self: &Arc<Self>, signal: LaunchSignal) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = match Arc::clone(&this.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // Semaphore closed on shutdown
            };

            crate::telemetry::EVENTS_IN_FLIGHT.inc();
            this.analyze_signal(signal).await;
            crate::telemetry::EVENTS_IN_FLIGHT.dec();
        });
    }

    async fn analyze_signal(&self, signal: LaunchSignal) {
        match self.resolver.resolve(&signal.signature).await {
            Ok(Some(event)) => {
                let state = self.process(event).await;
                debug!("Event {} finished in state {:?}", signal.signature, state);
            }
            Ok(None) => {
                debug!("Signature {} is not a usable launch. Skipping.", signal.signature);
                crate::telemetry::LAUNCHES_SKIPPED_TOTAL.inc();
            }
            Err(e) => {
                warn!("❌ Could not hydrate launch {}: {}", signal.signature, e);
            }
        }
    }

    /// Run one launch event through the full state machine and return
    /// its terminal state.
    pub async fn process(&self, event: LaunchEvent) -> EventState {
        info!(
            signature = %event.signature,
            mint = %event.base_mint,
            creator = %event.creator,
            "🚀 Launch detected"
        );

        let mut state = EventState::Detected;
        transition(&event, state, EventState::Enriching);
        state = EventState::Enriching;

        let deadline = self.settings.branch_timeout;
        let (dist, risk_score, dev_holding, dev_sold) = tokio::join!(
            run_branch("holders", deadline, self.analyze_distribution(&event)),
            run_branch("risk", deadline, self.risk.risk_score(&event.base_mint)),
            run_branch(
                "dev_holding",
                deadline,
                self.dev.holding_percentage(&event.creator, &event.base_mint)
            ),
            run_branch(
                "dev_sold",
                deadline,
                self.dev.has_sold(&event.creator, &event.base_mint)
            ),
        );

        let degraded =
            dist.is_none() || risk_score.is_none() || dev_holding.is_none() || dev_sold.is_none();

        // Documented substitution defaults. The *_known flags keep a
        // failed branch distinguishable from a genuine zero/false.
        let (risk_flagged, risk_known) = match risk_score {
            Some(score) => (score >= self.settings.risk_score_threshold, true),
            None => (false, false),
        };
        let (dev_holding_percentage, dev_holding_known) = match dev_holding {
            Some(pct) => (pct, true),
            None => (0.0, false),
        };
        let (dev_has_sold, dev_sold_known) = match dev_sold {
            Some(sold) => (sold, true),
            None => (false, false),
        };
        let distribution = dist.unwrap_or_default();

        let record = AnalysisRecord {
            lp_signature: event.signature.clone(),
            creator: event.creator.clone(),
            timestamp: event.detected_at,
            base_mint: event.base_mint.clone(),
            base_decimals: event.base_decimals,
            base_lp_amount: event.base_lp_amount,
            risk_flagged,
            risk_known,
            dev_holding_percentage,
            dev_holding_known,
            dev_has_sold,
            dev_sold_known,
            distribution,
        };

        transition(&event, state, EventState::Assembled);
        state = EventState::Assembled;

        match self.sink.append(&record).await {
            Ok(()) => {
                crate::telemetry::RECORDS_DELIVERED_TOTAL.inc();
                let terminal = if degraded {
                    EventState::Failed
                } else {
                    EventState::Delivered
                };
                transition(&event, state, terminal);
                terminal
            }
            Err(e) => {
                error!("❌ Failed to persist record for {}: {}", event.signature, e);
                transition(&event, state, EventState::Failed);
                EventState::Failed
            }
        }
    }

    /// The holder branch: one enumeration, one snapshot, then the two
    /// pure analyses applied sequentially to it.
    async fn analyze_distribution(
        &self,
        event: &LaunchEvent,
    ) -> Result<DistributionReport, EnrichError> {
        let records = self
            .holders
            .enumerate(&event.base_mint, event.base_decimals)
            .await?;

        let snapshot = distribute(records);
        if snapshot.is_undetermined() {
            // No eligible supply: report the state, do not fail the event.
            debug!("No holder data for {}; concentration undetermined", event.base_mint);
            return Ok(DistributionReport {
                holders_known: true,
                undetermined: true,
                ..DistributionReport::default()
            });
        }

        let concentration = top_n_concentration(&snapshot, self.settings.top_holder_count);
        let bundled = bundled_holdings(&snapshot, self.settings.bundle_threshold_pct);

        Ok(DistributionReport {
            holders_known: true,
            undetermined: false,
            holder_count: snapshot.holders.len(),
            concentration,
            bundled,
        })
    }
}

fn transition(event: &LaunchEvent, from: EventState, to: EventState) {
    debug!(
        signature = %event.signature,
        "Event state {:?} -> {:?}",
        from,
        to
    );
}

/// Run one enrichment branch under its deadline. Any failure is
/// logged and counted, and the branch settles as `None` so the other
/// branches and the event itself keep going.
async fn run_branch<T, F>(branch: &str, deadline: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, EnrichError>>,
{
    let outcome = match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(EnrichError::Timeout(deadline)),
    };

    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("⚠️ Enrichment branch '{}' degraded: {}", branch, e);
            crate::telemetry::BRANCH_FAILURES_TOTAL
                .with_label_values(&[branch])
                .inc();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use launch_core::HolderRecord;
    use std::sync::Mutex;

    struct StaticResolver;

    #[async_trait::async_trait]
    impl LaunchResolver for StaticResolver {
        async fn resolve(&self, _signature: &str) -> Result<Option<LaunchEvent>, EnrichError> {
            Ok(None)
        }
    }

    struct StubHolders {
        records: Vec<HolderRecord>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl HolderSource for StubHolders {
        async fn enumerate(
            &self,
            _mint: &str,
            _decimals: u8,
        ) -> Result<Vec<HolderRecord>, EnrichError> {
            if self.fail {
                return Err(EnrichError::UpstreamQuery("rpc down".to_string()));
            }
            Ok(self.records.clone())
        }
    }

    struct StubRisk {
        score: Result<f64, ()>,
        delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl RiskOracle for StubRisk {
        async fn risk_score(&self, _mint: &str) -> Result<f64, EnrichError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.score
                .map_err(|_| EnrichError::UpstreamQuery("risk api timeout".to_string()))
        }
    }

    struct StubDev {
        holding: f64,
        sold: bool,
    }

    #[async_trait::async_trait]
    impl DevScreen for StubDev {
        async fn holding_percentage(&self, _wallet: &str, _mint: &str) -> Result<f64, EnrichError> {
            Ok(self.holding)
        }

        async fn has_sold(&self, _wallet: &str, _mint: &str) -> Result<bool, EnrichError> {
            Ok(self.sold)
        }
    }

    #[derive(Default)]
    struct VecSink {
        records: Mutex<Vec<AnalysisRecord>>,
    }

    #[async_trait::async_trait]
    impl RecordSink for VecSink {
        async fn append(&self, record: &AnalysisRecord) -> Result<(), EnrichError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            top_holder_count: 10,
            bundle_threshold_pct: 1.0,
            risk_score_threshold: 10_000.0,
            branch_timeout: Duration::from_millis(100),
            max_concurrent_events: 4,
        }
    }

    fn event() -> LaunchEvent {
        LaunchEvent {
            signature: "sig-launch".to_string(),
            creator: "creator".to_string(),
            base_mint: "mint".to_string(),
            base_decimals: 6,
            base_lp_amount: 1000.0,
            detected_at: Utc::now(),
        }
    }

    fn holders_60_30_10() -> Vec<HolderRecord> {
        vec![
            HolderRecord { address: "A".to_string(), amount: 60.0 },
            HolderRecord { address: "B".to_string(), amount: 30.0 },
            HolderRecord { address: "C".to_string(), amount: 10.0 },
        ]
    }

    fn enricher(
        holders: StubHolders,
        risk: StubRisk,
        dev: StubDev,
        sink: Arc<VecSink>,
    ) -> Enricher {
        Enricher::new(
            Arc::new(StaticResolver),
            Arc::new(holders),
            Arc::new(risk),
            Arc::new(dev),
            sink,
            settings(),
        )
    }

    #[tokio::test]
    async fn test_clean_event_is_delivered_with_full_record() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: holders_60_30_10(), fail: false },
            StubRisk { score: Ok(12_021.0), delay: None },
            StubDev { holding: 5.5, sold: true },
            Arc::clone(&sink),
        );

        let state = enricher.process(event()).await;
        assert_eq!(state, EventState::Delivered);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];

        assert!(record.risk_flagged);
        assert!(record.risk_known);
        assert_eq!(record.dev_holding_percentage, 5.5);
        assert!(record.dev_has_sold);
        assert!(record.distribution.holders_known);
        assert!(!record.distribution.undetermined);
        assert_eq!(record.distribution.holder_count, 3);
        assert!((record.distribution.concentration.top_n_percentage - 100.0).abs() < 1e-9);
        assert!((record.distribution.bundled.bundled_percentage - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_risk_failure_substitutes_unknown_without_dropping_event() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: holders_60_30_10(), fail: false },
            StubRisk { score: Err(()), delay: None },
            StubDev { holding: 2.0, sold: false },
            Arc::clone(&sink),
        );

        let state = enricher.process(event()).await;
        assert_eq!(state, EventState::Failed);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];

        // Unknown risk, not false-risk.
        assert!(!record.risk_flagged);
        assert!(!record.risk_known);
        // Every other branch still populated normally.
        assert!(record.dev_holding_known);
        assert!(record.dev_sold_known);
        assert!(record.distribution.holders_known);
        assert_eq!(record.distribution.holder_count, 3);
    }

    #[tokio::test]
    async fn test_hung_risk_branch_times_out_and_event_survives() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: holders_60_30_10(), fail: false },
            StubRisk { score: Ok(0.0), delay: Some(Duration::from_secs(5)) },
            StubDev { holding: 0.0, sold: false },
            Arc::clone(&sink),
        );

        let state = enricher.process(event()).await;
        assert_eq!(state, EventState::Failed);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].risk_known);
        assert!(records[0].distribution.holders_known);
    }

    #[tokio::test]
    async fn test_empty_enumeration_reports_undetermined_not_failure() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: Vec::new(), fail: false },
            StubRisk { score: Ok(100.0), delay: None },
            StubDev { holding: 0.0, sold: false },
            Arc::clone(&sink),
        );

        let state = enricher.process(event()).await;
        assert_eq!(state, EventState::Delivered);

        let records = sink.records.lock().unwrap();
        let distribution = &records[0].distribution;
        assert!(distribution.holders_known);
        assert!(distribution.undetermined);
        assert_eq!(distribution.concentration.top_n_percentage, 0.0);
        assert_eq!(distribution.bundled.bundled_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_holder_branch_failure_clears_holders_known() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: Vec::new(), fail: true },
            StubRisk { score: Ok(100.0), delay: None },
            StubDev { holding: 1.0, sold: false },
            Arc::clone(&sink),
        );

        let state = enricher.process(event()).await;
        assert_eq!(state, EventState::Failed);

        let records = sink.records.lock().unwrap();
        let distribution = &records[0].distribution;
        assert!(!distribution.holders_known);
        assert!(!distribution.undetermined);
        assert!(records[0].risk_known);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_produces_two_records() {
        let sink = Arc::new(VecSink::default());
        let enricher = enricher(
            StubHolders { records: holders_60_30_10(), fail: false },
            StubRisk { score: Ok(100.0), delay: None },
            StubDev { holding: 0.0, sold: false },
            Arc::clone(&sink),
        );

        let first = enricher.process(event()).await;
        let second = enricher.process(event()).await;
        assert_eq!(first, EventState::Delivered);
        assert_eq!(second, EventState::Delivered);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lp_signature, records[1].lp_signature);
    }
}
