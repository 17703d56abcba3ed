// =============================================================================
// PNODE RADAR — metrics.rs
// Derived metrics: timestamp normalization, liveness, region, rank, risk
//
// Everything here is a pure function of the merged node set and `now`.
//
// Risk score (0..=100, higher = more suspect):
//   offline: 70 + 5 per full liveness window overdue, capped at 100
//   online:  staleness inside the window   0..10
//          + packet imbalance |rx-tx|/(rx+tx) 0..20
//          + storage used > committed       10
//          + nothing committed              5
// Online nodes therefore never score above 45, offline never below 70.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::constants::{FALLBACK_VERSION, MILLIS_THRESHOLD, UNKNOWN_ADDRESS};
use crate::merge::MergedNode;

pub const RISK_OFFLINE_BASE: u64 = 70;
pub const RISK_OFFLINE_STEP: u64 = 5;
pub const RISK_STALENESS_MAX: u64 = 10;
pub const RISK_IMBALANCE_MAX: f64 = 20.0;
pub const RISK_OVERCOMMIT: u64 = 10;
pub const RISK_NO_STORAGE: u64 = 5;

// -----------------------------------------------------------------------------
// Timestamps and liveness
// -----------------------------------------------------------------------------

/// Seconds-or-milliseconds heuristic: above the threshold the value is
/// already milliseconds.
pub fn to_millis(ts: u64) -> u64 {
    if ts > MILLIS_THRESHOLD {
        ts
    } else {
        ts.saturating_mul(1000)
    }
}

pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

impl NodeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Some(NodeStatus::Online),
            "offline" => Some(NodeStatus::Offline),
            _ => None,
        }
    }
}

/// Online iff seen within `window_ms`. A last-seen in the future counts as online.
pub fn status(now_ms: u64, last_seen_ms: u64, window_ms: u64) -> NodeStatus {
    if now_ms.saturating_sub(last_seen_ms) <= window_ms {
        NodeStatus::Online
    } else {
        NodeStatus::Offline
    }
}

// -----------------------------------------------------------------------------
// Region — coarse geolocation by IP prefix
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRule {
    pub prefix: String,
    pub region: String,
}

impl RegionRule {
    pub fn new(prefix: &str, region: &str) -> Self {
        RegionRule { prefix: prefix.to_string(), region: region.to_string() }
    }
}

/// Only valid while the seed population is small and known.
pub fn default_region_rules() -> Vec<RegionRule> {
    vec![
        RegionRule::new("173.212", "Germany, EU"),
        RegionRule::new("161.97", "Germany, EU"),
        RegionRule::new("5.189", "Germany, EU"),
        RegionRule::new("192.190", "USA, North America"),
        RegionRule::new("207.244", "USA, North America"),
        RegionRule::new("31.220", "USA, North America"),
        RegionRule::new("45.151", "London, UK"),
        RegionRule::new("147.93", "London, UK"),
    ]
}

fn ip_of(address: &str) -> &str {
    address.split(':').next().unwrap_or("").trim()
}

pub fn region(address: Option<&str>, rules: &[RegionRule], default_region: &str) -> String {
    let ip = address.map(ip_of).unwrap_or("");
    if ip.is_empty() {
        return default_region.to_string();
    }
    rules
        .iter()
        .find(|r| ip.starts_with(r.prefix.as_str()))
        .map(|r| r.region.clone())
        .unwrap_or_else(|| default_region.to_string())
}

pub fn display_address(address: Option<&str>) -> String {
    match address.map(str::trim) {
        Some(a) if !a.is_empty() && ip_of(a) != "0.0.0.0" && !ip_of(a).is_empty() => a.to_string(),
        _ => UNKNOWN_ADDRESS.to_string(),
    }
}

// -----------------------------------------------------------------------------
// Rank
// -----------------------------------------------------------------------------

/// 1-based ranks by credits descending, returned in input order.
/// Equal credits keep their input order (stable sort).
pub fn rank(credits: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..credits.len()).collect();
    order.sort_by(|&a, &b| credits[b].total_cmp(&credits[a]));
    let mut ranks = vec![0; credits.len()];
    for (pos, idx) in order.into_iter().enumerate() {
        ranks[idx] = pos + 1;
    }
    ranks
}

// -----------------------------------------------------------------------------
// Risk
// -----------------------------------------------------------------------------

pub fn risk_score(
    last_seen_ms: u64,
    now_ms: u64,
    window_ms: u64,
    packets_received: u64,
    packets_sent: u64,
    storage_committed: u64,
    storage_used: u64,
) -> u8 {
    let window = window_ms.max(1);
    let staleness = now_ms.saturating_sub(last_seen_ms);

    if staleness > window {
        let overdue = (staleness - window) / window;
        let score = RISK_OFFLINE_BASE + overdue.min(6) * RISK_OFFLINE_STEP;
        return score.min(100) as u8;
    }

    let mut score = staleness * RISK_STALENESS_MAX / window;

    let total = packets_received.saturating_add(packets_sent);
    if total > 0 {
        let diff = packets_received.abs_diff(packets_sent) as f64;
        score += (diff / total as f64 * RISK_IMBALANCE_MAX).round() as u64;
    }

    if storage_committed == 0 {
        score += RISK_NO_STORAGE;
    } else if storage_used > storage_committed {
        score += RISK_OVERCOMMIT;
    }

    score.min(100) as u8
}

// -----------------------------------------------------------------------------
// CanonicalNodeRecord
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalNodeRecord {
    pub pubkey: String,
    pub address: Option<String>,
    pub display_address: String,
    pub version: String,
    pub storage_committed: u64,
    pub storage_used: u64,
    pub credits: f64,
    pub uptime_secs: u64,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub last_seen_timestamp: u64,
    pub last_seen_ms: u64,
    pub is_public: Option<bool>,
    pub rpc_port: Option<u16>,
    pub region: String,
    pub status: NodeStatus,
    pub rank: usize,
    pub risk_score: u8,
}

impl CanonicalNodeRecord {
    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    /// Short form used by the terminal views: first 4 and last 4 chars.
    pub fn short_pubkey(&self) -> String {
        let chars: Vec<char> = self.pubkey.chars().collect();
        if chars.len() <= 10 {
            return self.pubkey.clone();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}..{}", head, tail)
    }
}

/// Canonical records for a merged set, ordered by rank.
pub fn derive_records(merged: Vec<MergedNode>, now_ms: u64, cfg: &AggregatorConfig) -> Vec<CanonicalNodeRecord> {
    let window_ms = cfg.liveness_window_ms();
    let credits: Vec<f64> = merged.iter().map(|m| m.observation.credits).collect();
    let ranks = rank(&credits);

    let mut records: Vec<CanonicalNodeRecord> = merged
        .into_iter()
        .zip(ranks)
        .map(|(m, rank)| {
            let o = m.observation;
            let address = o.network_address.clone();
            CanonicalNodeRecord {
                region: region(address.as_deref(), &cfg.region_rules, &cfg.default_region),
                display_address: display_address(address.as_deref()),
                status: status(now_ms, m.last_seen_ms, window_ms),
                risk_score: risk_score(
                    m.last_seen_ms,
                    now_ms,
                    window_ms,
                    o.packets_received,
                    o.packets_sent,
                    o.storage_committed,
                    o.storage_used,
                ),
                rank,
                pubkey: m.identity,
                address,
                version: o
                    .version_label
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_VERSION.to_string()),
                storage_committed: o.storage_committed,
                storage_used: o.storage_used,
                credits: o.credits,
                uptime_secs: o.uptime_secs,
                packets_received: o.packets_received,
                packets_sent: o.packets_sent,
                last_seen_timestamp: o.last_seen_timestamp,
                last_seen_ms: m.last_seen_ms,
                is_public: o.is_public,
                rpc_port: o.rpc_port,
            }
        })
        .collect();

    records.sort_by_key(|r| r.rank);
    records
}
