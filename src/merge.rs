// =============================================================================
// PNODE RADAR — merge.rs
// Node Merge/Dedup Engine
//
// Seeds report overlapping views of the same pods. One canonical observation
// per identity survives: the one with the greatest normalized last-seen.
// Strictly greater replaces; an equal timestamp keeps the first one seen, so
// the result depends only on seed order and per-seed order.
// Fields are never mixed across observations.
// =============================================================================

use std::collections::HashMap;

use crate::metrics::to_millis;
use crate::network::RawNodeObservation;

#[derive(Debug, Clone, PartialEq)]
pub struct MergedNode {
    pub identity: String,
    pub last_seen_ms: u64,
    pub observation: RawNodeObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub observations: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub unique: usize,
}

/// Merge per-seed observation lists, given in seed order.
pub fn merge_observations<'a, I>(per_seed: I) -> (Vec<MergedNode>, MergeReport)
where
    I: IntoIterator<Item = &'a [RawNodeObservation]>,
{
    let mut nodes: Vec<MergedNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut report = MergeReport::default();

    for observations in per_seed {
        for obs in observations {
            report.observations += 1;

            let Some(identity) = obs.identity() else {
                report.rejected += 1;
                continue;
            };
            let last_seen_ms = to_millis(obs.last_seen_timestamp);

            match index.get(identity) {
                Some(&slot) => {
                    report.duplicates += 1;
                    if last_seen_ms > nodes[slot].last_seen_ms {
                        nodes[slot].last_seen_ms = last_seen_ms;
                        nodes[slot].observation = obs.clone();
                    }
                }
                None => {
                    index.insert(identity.to_string(), nodes.len());
                    nodes.push(MergedNode {
                        identity: identity.to_string(),
                        last_seen_ms,
                        observation: obs.clone(),
                    });
                }
            }
        }
    }

    report.unique = nodes.len();
    if report.rejected > 0 {
        log::debug!("merge: {} observations without identity skipped", report.rejected);
    }
    (nodes, report)
}
