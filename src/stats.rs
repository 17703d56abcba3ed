// =============================================================================
// PNODE RADAR — stats.rs
// Summary views over one canonical node set
//
//   AggregateStats     — totals for the overview page
//   RegionSummary      — per-region count / online / storage / share
//   StorageBucket      — committed-capacity distribution
//   leaderboard()      — top nodes by credits
//   top_storage()      — top nodes by committed capacity
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::metrics::CanonicalNodeRecord;

pub const GB: u64 = 1_000_000_000;
pub const TB: u64 = 1_000 * GB;

// -----------------------------------------------------------------------------
// AggregateStats
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_nodes: usize,
    pub online_count: usize,
    pub offline_count: usize,
    pub total_storage_capacity: u64,
    pub total_storage_used: u64,
    pub total_credits: f64,
    pub utilization_pct: f64,
    pub seeds_queried: usize,
    pub seeds_responded: usize,
}

impl AggregateStats {
    pub fn from_records(records: &[CanonicalNodeRecord], seeds_queried: usize, seeds_responded: usize) -> Self {
        let online_count = records.iter().filter(|r| r.is_online()).count();
        let total_storage_capacity = records.iter().fold(0u64, |acc, r| acc.saturating_add(r.storage_committed));
        let total_storage_used = records.iter().fold(0u64, |acc, r| acc.saturating_add(r.storage_used));
        let utilization_pct = if total_storage_capacity > 0 {
            total_storage_used as f64 / total_storage_capacity as f64 * 100.0
        } else {
            0.0
        };

        AggregateStats {
            total_nodes: records.len(),
            online_count,
            offline_count: records.len() - online_count,
            total_storage_capacity,
            total_storage_used,
            total_credits: records.iter().map(|r| r.credits).sum(),
            utilization_pct,
            seeds_queried,
            seeds_responded,
        }
    }
}

impl std::fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "╔══════════════════════════════════════════════╗\n\
             ║  pNODE NETWORK — STATS                       ║\n\
             ╠══════════════════════════════════════════════╣\n\
             ║  Nodes:    {:>6}  Online:  {:>6}            ║\n\
             ║  Capacity: {:>14}                    ║\n\
             ║  Used:     {:>14}  ({:>5.1}%)          ║\n\
             ║  Credits:  {:>14.0}                    ║\n\
             ║  Seeds:    {:>3}/{:<3} answered                   ║\n\
             ╚══════════════════════════════════════════════╝",
            self.total_nodes, self.online_count,
            format_bytes(self.total_storage_capacity),
            format_bytes(self.total_storage_used), self.utilization_pct,
            self.total_credits,
            self.seeds_responded, self.seeds_queried,
        )
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes >= TB {
        format!("{:.2} TB", b / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", b / GB as f64)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MB", b / 1e6)
    } else {
        format!("{} B", bytes)
    }
}

// -----------------------------------------------------------------------------
// RegionSummary
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub name: String,
    pub count: usize,
    pub online: usize,
    pub storage: u64,
    pub percentage: f64,
}

/// Regions by node count descending; equal counts keep first-seen order.
pub fn region_breakdown(records: &[CanonicalNodeRecord]) -> Vec<RegionSummary> {
    let mut out: Vec<RegionSummary> = Vec::new();
    for r in records {
        let slot = match out.iter().position(|s| s.name == r.region) {
            Some(i) => i,
            None => {
                out.push(RegionSummary { name: r.region.clone(), count: 0, online: 0, storage: 0, percentage: 0.0 });
                out.len() - 1
            }
        };
        let s = &mut out[slot];
        s.count += 1;
        if r.is_online() {
            s.online += 1;
        }
        s.storage = s.storage.saturating_add(r.storage_committed);
    }

    let total = records.len().max(1) as f64;
    for s in &mut out {
        s.percentage = (s.count as f64 / total * 1000.0).round() / 10.0;
    }
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

// -----------------------------------------------------------------------------
// StorageBucket
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBucket {
    pub range: String,
    pub count: usize,
}

const BUCKETS: [(&str, u64, u64); 5] = [
    ("0-100G", 0, 100 * GB),
    ("100-500G", 100 * GB, 500 * GB),
    ("500G-1T", 500 * GB, TB),
    ("1T-10T", TB, 10 * TB),
    ("10T+", 10 * TB, u64::MAX),
];

pub fn storage_distribution(records: &[CanonicalNodeRecord]) -> Vec<StorageBucket> {
    BUCKETS
        .iter()
        .map(|(range, lo, hi)| StorageBucket {
            range: range.to_string(),
            count: records
                .iter()
                .filter(|r| r.storage_committed >= *lo && (r.storage_committed < *hi || *hi == u64::MAX))
                .count(),
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Top lists
// -----------------------------------------------------------------------------

/// Top `n` by rank (records may arrive in any order).
pub fn leaderboard(records: &[CanonicalNodeRecord], n: usize) -> Vec<CanonicalNodeRecord> {
    let mut v: Vec<&CanonicalNodeRecord> = records.iter().collect();
    v.sort_by_key(|r| r.rank);
    v.into_iter().take(n).cloned().collect()
}

pub fn top_storage(records: &[CanonicalNodeRecord], n: usize) -> Vec<CanonicalNodeRecord> {
    let mut v: Vec<&CanonicalNodeRecord> = records.iter().collect();
    v.sort_by(|a, b| b.storage_committed.cmp(&a.storage_committed));
    v.into_iter().take(n).cloned().collect()
}
