// =============================================================================
// PNODE RADAR — store.rs
// Aggregation Cache/Store
//
// Owns the latest committed snapshot. A refresh builds a complete new
// Snapshot off to the side and swaps the Arc in one assignment; readers hold
// whichever Arc they grabbed and never see a half-built set. When refreshes
// overlap, the last one to finish wins.
//
// FeedState:
//   Loading  — nothing committed yet
//   Live     — last refresh reached at least one seed
//   Empty    — seeds answered, zero nodes
//   Degraded — last refresh reached no seed; previous records (if any) kept
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::AggregatorConfig;
use crate::error::AggregatorError;
use crate::merge::{merge_observations, MergeReport};
use crate::metrics::{derive_records, now_millis, CanonicalNodeRecord, NodeStatus};
use crate::prpc::{SeedClient, SeedOutcome, SeedReport};
use crate::stats::AggregateStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedState {
    Loading,
    Live,
    Empty,
    Degraded,
}

impl FeedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedState::Loading => "loading",
            FeedState::Live => "live",
            FeedState::Empty => "empty",
            FeedState::Degraded => "degraded",
        }
    }
}

// -----------------------------------------------------------------------------
// Snapshot
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: FeedState,
    pub records: Vec<CanonicalNodeRecord>,
    pub stats: AggregateStats,
    /// When `records` were computed; unchanged by a degraded refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub seeds: Vec<SeedReport>,
}

impl Snapshot {
    pub fn loading() -> Self {
        Snapshot {
            state: FeedState::Loading,
            records: Vec::new(),
            stats: AggregateStats::default(),
            refreshed_at: None,
            last_attempt_at: None,
            last_error: None,
            seeds: Vec::new(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.state == FeedState::Degraded
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeFilter {
    pub pubkey: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl NodeFilter {
    /// Rejects a `status` that is neither `online` nor `offline`.
    pub fn validate(&self) -> Result<(), AggregatorError> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(status) if NodeStatus::parse(status).is_none() => {
                Err(AggregatorError::InvalidFilter(format!("unknown status '{}'", status)))
            }
            _ => Ok(()),
        }
    }

    pub fn matches(&self, r: &CanonicalNodeRecord) -> bool {
        if let Some(pk) = self.pubkey.as_deref().filter(|s| !s.is_empty()) {
            if r.pubkey != pk {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref().filter(|s| !s.is_empty() && *s != "All Regions") {
            if r.region != region {
                return false;
            }
        }
        if let Some(status) = self.status.as_deref().map(str::trim).and_then(NodeStatus::parse) {
            if r.status != status {
                return false;
            }
        }
        if let Some(q) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let q = q.to_lowercase();
            if !r.pubkey.to_lowercase().contains(&q) && !r.display_address.to_lowercase().contains(&q) {
                return false;
            }
        }
        true
    }
}

// -----------------------------------------------------------------------------
// AggregationStore
// -----------------------------------------------------------------------------

pub struct AggregationStore {
    config: AggregatorConfig,
    client: SeedClient,
    current: RwLock<Arc<Snapshot>>,
    refresh_count: AtomicU64,
    failed_refreshes: AtomicU64,
}

impl AggregationStore {
    pub fn new(config: AggregatorConfig) -> Arc<Self> {
        let client = SeedClient::from_config(&config);
        Arc::new(AggregationStore {
            config,
            client,
            current: RwLock::new(Arc::new(Snapshot::loading())),
            refresh_count: AtomicU64::new(0),
            failed_refreshes: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }

    pub fn failed_refreshes(&self) -> u64 {
        self.failed_refreshes.load(Ordering::Relaxed)
    }

    pub async fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }

    /// Fan out to every seed, then commit.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, AggregatorError> {
        let outcomes = self.client.fan_out(&self.config.seeds).await;
        self.ingest(outcomes, now_millis()).await
    }

    /// Merge, derive and commit one cycle's seed outcomes.
    pub async fn ingest(&self, outcomes: Vec<SeedOutcome>, now_ms: u64) -> Result<Arc<Snapshot>, AggregatorError> {
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
        let attempted_at = Utc::now();
        let seeds: Vec<SeedReport> = outcomes.iter().map(SeedOutcome::report).collect();
        let responded = outcomes.iter().filter(|o| o.is_ok()).count();

        if responded == 0 {
            let err = AggregatorError::TotalAggregationFailure { seeds: outcomes.len() };
            self.failed_refreshes.fetch_add(1, Ordering::Relaxed);

            let mut current = self.current.write().await;
            // node totals stay last-known; seed counters describe this cycle
            let mut stats = current.stats.clone();
            stats.seeds_queried = outcomes.len();
            stats.seeds_responded = 0;
            let degraded = Snapshot {
                state: FeedState::Degraded,
                records: current.records.clone(),
                stats,
                refreshed_at: current.refreshed_at,
                last_attempt_at: Some(attempted_at),
                last_error: Some(err.to_string()),
                seeds,
            };
            log::error!(
                "❌ refresh failed: {} (serving {} last-known records)",
                err,
                degraded.records.len()
            );
            *current = Arc::new(degraded);
            return Err(err);
        }

        let (merged, report) = merge_observations(outcomes.iter().map(SeedOutcome::observations));
        let records = derive_records(merged, now_ms, &self.config);
        let stats = AggregateStats::from_records(&records, outcomes.len(), responded);
        let state = if records.is_empty() { FeedState::Empty } else { FeedState::Live };

        let snapshot = Arc::new(Snapshot {
            state,
            records,
            stats,
            refreshed_at: Some(attempted_at),
            last_attempt_at: Some(attempted_at),
            last_error: None,
            seeds,
        });
        log_commit(&snapshot, &report);

        *self.current.write().await = snapshot.clone();
        Ok(snapshot)
    }

    pub async fn list_nodes(&self, filter: &NodeFilter) -> Vec<CanonicalNodeRecord> {
        let snapshot = self.current_snapshot().await;
        snapshot.records.iter().filter(|r| filter.matches(r)).cloned().collect()
    }

    pub async fn find_node(&self, pubkey: &str) -> Result<CanonicalNodeRecord, AggregatorError> {
        let snapshot = self.current_snapshot().await;
        snapshot
            .records
            .iter()
            .find(|r| r.pubkey == pubkey)
            .cloned()
            .ok_or_else(|| AggregatorError::IdentityNotFound(pubkey.to_string()))
    }

    pub async fn stats(&self) -> AggregateStats {
        self.current_snapshot().await.stats.clone()
    }
}

fn log_commit(snapshot: &Snapshot, report: &MergeReport) {
    log::info!(
        "✅ snapshot committed: {} nodes ({} online) from {} observations, {} duplicates, {} rejected",
        snapshot.stats.total_nodes,
        snapshot.stats.online_count,
        report.observations,
        report.duplicates,
        report.rejected,
    );
}

/// Refresh on the configured interval until the task is aborted.
pub fn spawn_refresh_loop(store: Arc<AggregationStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = store.config().refresh_interval;
        log::info!("🔄 refresh loop started (every {}s)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // failure is already logged and recorded in the snapshot
            let _ = store.refresh().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RawNodeObservation;

    const NOW: u64 = 1_700_000_300_000;

    fn pod(id: &str, ts_secs: u64, credits: f64) -> RawNodeObservation {
        RawNodeObservation {
            identity: Some(id.to_string()),
            network_address: Some("173.212.220.65:9001".into()),
            last_seen_timestamp: ts_secs,
            credits,
            storage_committed: 1_000,
            storage_used: 100,
            ..Default::default()
        }
    }

    fn down(seed: &str) -> SeedOutcome {
        SeedOutcome::failed(seed, AggregatorError::SeedUnreachable { seed: seed.into(), reason: "timeout".into() })
    }

    fn store() -> Arc<AggregationStore> {
        let mut cfg = AggregatorConfig::default();
        cfg.seeds = vec!["127.0.0.1:1".into()];
        AggregationStore::new(cfg)
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let s = store();
        let snap = s.current_snapshot().await;
        assert_eq!(snap.state, FeedState::Loading);
        assert!(snap.records.is_empty());
        assert!(snap.refreshed_at.is_none());
    }

    #[tokio::test]
    async fn test_ingest_partial_failure() {
        let s = store();
        let outcomes = vec![
            SeedOutcome::ok("a", vec![pod("A", 1_700_000_000, 1.0), pod("B", 1_700_000_000, 2.0), pod("C", 1_700_000_000, 3.0)]),
            down("b"),
        ];
        let snap = s.ingest(outcomes, NOW).await.unwrap();
        assert_eq!(snap.state, FeedState::Live);
        assert_eq!(snap.records.len(), 3);
        assert_eq!(snap.stats.seeds_queried, 2);
        assert_eq!(snap.stats.seeds_responded, 1);
        assert_eq!(snap.records[0].pubkey, "C");
        assert!(!snap.seeds[1].ok);
    }

    #[tokio::test]
    async fn test_dedup_across_seeds() {
        let s = store();
        let outcomes = vec![
            SeedOutcome::ok("a", vec![pod("X", 1000, 1.0)]),
            SeedOutcome::ok("b", vec![pod("X", 2000, 7.0)]),
        ];
        let snap = s.ingest(outcomes, NOW).await.unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].credits, 7.0);
        assert_eq!(snap.records[0].last_seen_ms, 2_000_000);
    }

    #[tokio::test]
    async fn test_total_failure_keeps_last_known_good() {
        let s = store();
        s.ingest(vec![SeedOutcome::ok("a", vec![pod("A", 1_700_000_000, 1.0)])], NOW).await.unwrap();
        let good = s.current_snapshot().await;

        let err = s.ingest(vec![down("a"), down("b")], NOW).await.unwrap_err();
        assert!(matches!(err, AggregatorError::TotalAggregationFailure { seeds: 2 }));

        let snap = s.current_snapshot().await;
        assert_eq!(snap.state, FeedState::Degraded);
        assert!(snap.is_stale());
        assert_eq!(snap.records, good.records);
        assert_eq!(snap.refreshed_at, good.refreshed_at);
        assert_eq!(snap.stats.total_nodes, good.stats.total_nodes);
        assert_eq!(snap.stats.seeds_queried, 2);
        assert_eq!(snap.stats.seeds_responded, 0);
        assert!(snap.seeds.iter().all(|r| !r.ok));
        assert!(snap.last_error.is_some());
        assert_eq!(s.failed_refreshes(), 1);
        assert_eq!(s.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_total_failure_before_any_data() {
        let s = store();
        assert!(s.ingest(vec![down("a")], NOW).await.is_err());
        let snap = s.current_snapshot().await;
        assert_eq!(snap.state, FeedState::Degraded);
        assert!(snap.records.is_empty());
    }

    #[tokio::test]
    async fn test_zero_nodes_is_empty_not_degraded() {
        let s = store();
        let snap = s.ingest(vec![SeedOutcome::ok("a", vec![]), down("b")], NOW).await.unwrap();
        assert_eq!(snap.state, FeedState::Empty);
        assert_eq!(snap.stats.total_nodes, 0);
    }

    #[tokio::test]
    async fn test_no_seeds_is_total_failure() {
        let s = store();
        assert!(matches!(
            s.ingest(vec![], NOW).await,
            Err(AggregatorError::TotalAggregationFailure { seeds: 0 })
        ));
    }

    #[tokio::test]
    async fn test_recovery_replaces_whole_set() {
        let s = store();
        s.ingest(vec![SeedOutcome::ok("a", vec![pod("A", 1_700_000_000, 1.0), pod("B", 1_700_000_000, 1.0)])], NOW)
            .await
            .unwrap();
        let _ = s.ingest(vec![down("a")], NOW).await;
        let snap = s.ingest(vec![SeedOutcome::ok("a", vec![pod("C", 1_700_000_000, 1.0)])], NOW).await.unwrap();
        assert_eq!(snap.state, FeedState::Live);
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].pubkey, "C");
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn test_readers_keep_their_snapshot() {
        let s = store();
        s.ingest(vec![SeedOutcome::ok("a", vec![pod("A", 1_700_000_000, 1.0)])], NOW).await.unwrap();
        let held = s.current_snapshot().await;
        s.ingest(vec![SeedOutcome::ok("a", vec![pod("B", 1_700_000_000, 1.0)])], NOW).await.unwrap();
        assert_eq!(held.records[0].pubkey, "A");
        assert_eq!(s.current_snapshot().await.records[0].pubkey, "B");
    }

    #[tokio::test]
    async fn test_find_and_filter() {
        let s = store();
        let mut offline = pod("OFF", 1_000, 1.0);
        offline.network_address = Some("8.8.8.8:9001".into());
        s.ingest(vec![SeedOutcome::ok("a", vec![pod("ON", 1_700_000_000, 5.0), offline])], NOW)
            .await
            .unwrap();

        assert_eq!(s.find_node("ON").await.unwrap().rank, 1);
        assert!(matches!(s.find_node("nope").await, Err(AggregatorError::IdentityNotFound(_))));

        let online = s.list_nodes(&NodeFilter { status: Some("online".into()), ..Default::default() }).await;
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].pubkey, "ON");

        let global = s.list_nodes(&NodeFilter { region: Some("Global Node".into()), ..Default::default() }).await;
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].pubkey, "OFF");

        let all = s.list_nodes(&NodeFilter { region: Some("All Regions".into()), ..Default::default() }).await;
        assert_eq!(all.len(), 2);

        let search = s.list_nodes(&NodeFilter { search: Some("8.8.8".into()), ..Default::default() }).await;
        assert_eq!(search.len(), 1);

        let one = s.list_nodes(&NodeFilter { pubkey: Some("ON".into()), ..Default::default() }).await;
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_filter_validation() {
        assert!(NodeFilter::default().validate().is_ok());
        assert!(NodeFilter { status: Some("Online".into()), ..Default::default() }.validate().is_ok());
        assert!(NodeFilter { status: Some("".into()), ..Default::default() }.validate().is_ok());
        assert!(matches!(
            NodeFilter { status: Some("bogus".into()), ..Default::default() }.validate(),
            Err(AggregatorError::InvalidFilter(_))
        ));
    }

    #[tokio::test]
    async fn test_overlapping_ingests_commit_one_whole_set() {
        let s = store();
        let set_a = vec![SeedOutcome::ok("a", vec![pod("A1", 1_700_000_000, 1.0), pod("A2", 1_700_000_000, 2.0)])];
        let set_b = vec![SeedOutcome::ok(
            "b",
            vec![pod("B1", 1_700_000_000, 1.0), pod("B2", 1_700_000_000, 2.0), pod("B3", 1_700_000_000, 3.0)],
        )];

        let (ra, rb) = tokio::join!(s.ingest(set_a, NOW), s.ingest(set_b, NOW));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        let snap = s.current_snapshot().await;
        let ids: Vec<&str> = snap.records.iter().map(|r| r.pubkey.as_str()).collect();
        let all_a = ids.len() == 2 && ids.iter().all(|id| id.starts_with('A'));
        let all_b = ids.len() == 3 && ids.iter().all(|id| id.starts_with('B'));
        assert!(all_a ^ all_b, "mixed snapshot: {:?}", ids);
        assert_eq!(snap.stats.total_nodes, snap.records.len());
        assert!(Arc::ptr_eq(&snap, &ra) || Arc::ptr_eq(&snap, &rb));
        assert_eq!(s.refresh_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_ticks_on_interval() {
        use std::time::Duration;

        let mut cfg = AggregatorConfig::default();
        // no seeds: every cycle fails fast without I/O
        cfg.seeds = Vec::new();
        cfg.refresh_interval = Duration::from_secs(15);
        let s = AggregationStore::new(cfg);
        let handle = spawn_refresh_loop(s.clone());

        // first tick fires immediately
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(s.refresh_count(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(s.refresh_count(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(s.refresh_count(), 2);

        tokio::time::advance(Duration::from_secs(15)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(s.refresh_count(), 3);
        assert_eq!(s.current_snapshot().await.state, FeedState::Degraded);

        handle.abort();
    }

    #[tokio::test]
    async fn test_refresh_against_unreachable_seed() {
        let mut cfg = AggregatorConfig::default();
        // nothing listens on port 1
        cfg.seeds = vec!["127.0.0.1:1".into()];
        cfg.rpc_timeout = std::time::Duration::from_millis(500);
        let s = AggregationStore::new(cfg);
        assert!(s.refresh().await.is_err());
        assert_eq!(s.current_snapshot().await.state, FeedState::Degraded);
    }
}
