// =============================================================================
// PNODE RADAR — prpc.rs
// Seed Query Fan-out
//
// One POST per seed, all in flight at once, every one allowed to settle.
// A seed that times out, refuses, answers non-2xx or sends garbage simply
// contributes nothing this cycle. No retries: the next poll is the retry.
// Outcomes come back in configured seed order so the merge is reproducible.
// =============================================================================

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;

use crate::config::AggregatorConfig;
use crate::error::AggregatorError;
use crate::network::{decode_response, RawNodeObservation, RpcMethod, RpcRequest};

// -----------------------------------------------------------------------------
// SeedOutcome — what one seed contributed to one cycle
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct SeedOutcome {
    pub seed: String,
    pub latency_ms: u64,
    pub result: Result<Vec<RawNodeObservation>, AggregatorError>,
}

impl SeedOutcome {
    pub fn ok(seed: &str, observations: Vec<RawNodeObservation>) -> Self {
        SeedOutcome { seed: seed.to_string(), latency_ms: 0, result: Ok(observations) }
    }

    pub fn failed(seed: &str, error: AggregatorError) -> Self {
        SeedOutcome { seed: seed.to_string(), latency_ms: 0, result: Err(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn observations(&self) -> &[RawNodeObservation] {
        match &self.result {
            Ok(obs) => obs.as_slice(),
            Err(_) => &[],
        }
    }

    pub fn report(&self) -> SeedReport {
        SeedReport {
            seed: self.seed.clone(),
            ok: self.is_ok(),
            observations: self.observations().len(),
            latency_ms: self.latency_ms,
            error: self.result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub seed: String,
    pub ok: bool,
    pub observations: usize,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// `host` gets the default port, `host:port` is used as is.
pub fn seed_rpc_url(seed: &str, default_port: u16) -> String {
    let seed = seed.trim().trim_start_matches("http://");
    if seed.contains(':') {
        format!("http://{}/rpc", seed)
    } else {
        format!("http://{}:{}/rpc", seed, default_port)
    }
}

// -----------------------------------------------------------------------------
// SeedClient
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeedClient {
    http: reqwest::Client,
    method: RpcMethod,
    rpc_port: u16,
}

impl SeedClient {
    pub fn new(method: RpcMethod, rpc_port: u16, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("seed client builder failed ({}), using defaults", e);
                reqwest::Client::new()
            });
        SeedClient { http, method, rpc_port }
    }

    pub fn from_config(cfg: &AggregatorConfig) -> Self {
        Self::new(cfg.rpc_method, cfg.rpc_port, cfg.rpc_timeout)
    }

    pub async fn query_seed(&self, seed: &str) -> SeedOutcome {
        let started = Instant::now();
        let mut outcome = match self.call(seed).await {
            Ok(pods) => SeedOutcome::ok(seed, pods),
            Err(e) => SeedOutcome::failed(seed, e),
        };
        outcome.latency_ms = started.elapsed().as_millis() as u64;

        match &outcome.result {
            Ok(pods) => log::debug!("seed {} answered {} pods in {}ms", seed, pods.len(), outcome.latency_ms),
            Err(e) if e.is_seed_failure() => log::warn!("⚠️ {}", e),
            Err(e) => log::error!("❌ seed {}: {}", seed, e),
        }
        outcome
    }

    async fn call(&self, seed: &str) -> Result<Vec<RawNodeObservation>, AggregatorError> {
        let url = seed_rpc_url(seed, self.rpc_port);
        let unreachable = |reason: String| AggregatorError::SeedUnreachable { seed: seed.to_string(), reason };

        let resp = self
            .http
            .post(&url)
            .json(&RpcRequest::new(self.method))
            .send()
            .await
            .map_err(|e| unreachable(describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(unreachable(format!("HTTP {}", status)));
        }

        let body = resp.bytes().await.map_err(|e| unreachable(describe(&e)))?;
        decode_response(&body)
            .map_err(|reason| AggregatorError::MalformedResponse { seed: seed.to_string(), reason })
    }

    /// Query every seed concurrently and wait for all of them.
    pub async fn fan_out(&self, seeds: &[String]) -> Vec<SeedOutcome> {
        let outcomes = join_all(seeds.iter().map(|seed| self.query_seed(seed))).await;

        let ok = outcomes.iter().filter(|o| o.is_ok()).count();
        log::info!("📡 fan-out: {}/{} seeds answered", ok, seeds.len());
        outcomes
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
