mod api;
mod config;
mod constants;
mod dashboard;
mod error;
mod merge;
mod metrics;
mod network;
mod prpc;
mod stats;
mod store;

use std::time::Duration;

use crate::config::AggregatorConfig;
use crate::dashboard::DashboardRenderer;
use crate::error::AggregatorError;
use crate::store::{spawn_refresh_loop, AggregationStore};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("serve");
    let config = AggregatorConfig::from_env();

    let result = match cmd {
        "serve"    => { constants::print_banner(); run_server(config).await }
        "snapshot" => run_snapshot(config).await,
        "watch"    => run_watch(config).await,
        "node"     => match args.get(2) {
            Some(pubkey) => run_node(config, pubkey).await,
            None => {
                eprintln!("usage: pnode-radar node <pubkey>");
                std::process::exit(2);
            }
        },
        _ => {
            print_help();
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("pnode-radar — available commands:");
    println!("  serve          — HTTP API + periodic refresh (default)");
    println!("  snapshot       — one refresh, print the dashboard");
    println!("  watch          — refresh on the interval, redraw each cycle");
    println!("  node <pubkey>  — one refresh, print a single node as JSON");
    println!();
    println!("env: PNODE_SEEDS PNODE_RPC_PORT PNODE_RPC_METHOD PNODE_RPC_TIMEOUT_MS");
    println!("     PNODE_LIVENESS_SECS PNODE_REFRESH_SECS PNODE_LISTEN_ADDR");
    println!("     PNODE_REGION_RULES PNODE_DEFAULT_REGION RUST_LOG");
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_server(config: AggregatorConfig) -> Result<(), AggregatorError> {
    let listen_addr = config.listen_addr.clone();
    log::info!(
        "🌱 {} seeds, method {}, timeout {}ms, refresh every {}s",
        config.seeds.len(),
        config.rpc_method.as_str(),
        config.rpc_timeout.as_millis(),
        config.refresh_interval.as_secs()
    );

    let store = AggregationStore::new(config);
    let poller = spawn_refresh_loop(store.clone());

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    log::info!("🚀 API listening on http://{}", listen_addr);

    let served = axum::serve(listener, api::router(store)).await;
    poller.abort();
    served.map_err(AggregatorError::from)
}

async fn run_snapshot(config: AggregatorConfig) -> Result<(), AggregatorError> {
    let store = AggregationStore::new(config);
    let outcome = store.refresh().await;
    print!("{}", DashboardRenderer::render_full(&*store.current_snapshot().await));
    println!("{}", store.stats().await);
    outcome.map(|_| ())
}

async fn run_watch(config: AggregatorConfig) -> Result<(), AggregatorError> {
    let period = config.refresh_interval;
    let store = AggregationStore::new(config);
    loop {
        // failures show up as a DEGRADED badge
        let _ = store.refresh().await;
        print!("\x1b[2J\x1b[H{}", DashboardRenderer::render_full(&*store.current_snapshot().await));
        tokio::time::sleep(period.max(Duration::from_secs(1))).await;
    }
}

async fn run_node(config: AggregatorConfig, pubkey: &str) -> Result<(), AggregatorError> {
    let store = AggregationStore::new(config);
    store.refresh().await?;
    let node = store.find_node(pubkey).await?;
    match serde_json::to_string_pretty(&node) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("cannot encode node {}: {}", pubkey, e),
    }
    Ok(())
}
