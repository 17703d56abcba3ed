// =============================================================================
// PNODE RADAR — config.rs
// Static configuration: seeds, timeouts, liveness window, refresh cadence,
// region table. Everything has a default and can be overridden from env.
//
//   PNODE_SEEDS="173.212.220.65,161.97.97.41;10.0.0.5:7000"
//   PNODE_REGION_RULES="173.212=Germany, EU;192.190=USA, North America"
// =============================================================================

use std::time::Duration;

use crate::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_REGION, DEFAULT_RPC_PORT, DEFAULT_SEED_IPS, LIVENESS_WINDOW_SECS,
    MAX_SEEDS, REFRESH_INTERVAL_SECS,
};
use crate::metrics::{default_region_rules, RegionRule};
use crate::network::RpcMethod;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub seeds: Vec<String>,
    pub rpc_port: u16,
    pub rpc_method: RpcMethod,
    pub rpc_timeout: Duration,
    pub liveness_window: Duration,
    pub refresh_interval: Duration,
    pub listen_addr: String,
    pub region_rules: Vec<RegionRule>,
    pub default_region: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let method = RpcMethod::default();
        AggregatorConfig {
            seeds: DEFAULT_SEED_IPS.iter().map(|s| s.to_string()).collect(),
            rpc_port: DEFAULT_RPC_PORT,
            rpc_method: method,
            rpc_timeout: Duration::from_millis(method.default_timeout_ms()),
            liveness_window: Duration::from_secs(LIVENESS_WINDOW_SECS),
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            region_rules: default_region_rules(),
            default_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl AggregatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AggregatorConfig::default();

        if let Some(raw) = lookup("PNODE_SEEDS") {
            let seeds = parse_seeds(&raw);
            if seeds.is_empty() {
                log::warn!("PNODE_SEEDS has no usable entries, keeping defaults");
            } else {
                cfg.seeds = seeds;
            }
        }

        if let Some(port) = parse_var::<u16, _>(&lookup, "PNODE_RPC_PORT").filter(|p| *p != 0) {
            cfg.rpc_port = port;
        }

        if let Some(raw) = lookup("PNODE_RPC_METHOD") {
            match RpcMethod::parse(&raw) {
                Some(m) => {
                    cfg.rpc_method = m;
                    cfg.rpc_timeout = Duration::from_millis(m.default_timeout_ms());
                }
                None => log::warn!("PNODE_RPC_METHOD ignored (unknown method): {}", raw),
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "PNODE_RPC_TIMEOUT_MS").filter(|v| *v > 0) {
            cfg.rpc_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PNODE_LIVENESS_SECS").filter(|v| *v > 0) {
            cfg.liveness_window = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PNODE_REFRESH_SECS").filter(|v| *v > 0) {
            cfg.refresh_interval = Duration::from_secs(secs);
        }

        if let Some(addr) = lookup("PNODE_LISTEN_ADDR").map(|s| s.trim().to_string()) {
            if !addr.is_empty() {
                cfg.listen_addr = addr;
            }
        }

        if let Some(raw) = lookup("PNODE_REGION_RULES") {
            let rules = parse_region_rules(&raw);
            if rules.is_empty() {
                log::warn!("PNODE_REGION_RULES has no usable entries, keeping defaults");
            } else {
                cfg.region_rules = rules;
            }
        }

        if let Some(label) = lookup("PNODE_DEFAULT_REGION").map(|s| s.trim().to_string()) {
            if !label.is_empty() {
                cfg.default_region = label;
            }
        }

        cfg
    }

    pub fn liveness_window_ms(&self) -> u64 {
        self.liveness_window.as_millis() as u64
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("{} ignored (not a valid value): {}", key, raw);
            None
        }
    }
}

/// Seeds separated by `,` or `;`, blanks skipped, duplicates dropped, capped at MAX_SEEDS.
pub fn parse_seeds(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split([',', ';']) {
        let item = item.trim();
        if item.is_empty() || out.iter().any(|s| s == item) {
            continue;
        }
        out.push(item.to_string());
        if out.len() >= MAX_SEEDS {
            log::warn!("PNODE_SEEDS truncated to {} entries", MAX_SEEDS);
            break;
        }
    }
    out
}

/// `prefix=Region;prefix=Region`, order preserved.
pub fn parse_region_rules(raw: &str) -> Vec<RegionRule> {
    let mut out = Vec::new();
    for item in raw.split(';') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('=') {
            Some((prefix, region)) if !prefix.trim().is_empty() && !region.trim().is_empty() => {
                out.push(RegionRule::new(prefix.trim(), region.trim()));
            }
            _ => log::warn!("PNODE_REGION_RULES entry ignored (need prefix=region): {}", item),
        }
    }
    out
}
