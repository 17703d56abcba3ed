use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{LEADERBOARD_SIZE, SERVICE_NAME, TOP_STORAGE_SIZE, VERSION};
use crate::error::AggregatorError;
use crate::metrics::CanonicalNodeRecord;
use crate::stats::{leaderboard, region_breakdown, storage_distribution, top_storage, AggregateStats, RegionSummary, StorageBucket};
use crate::store::{AggregationStore, FeedState, NodeFilter};

type AppState = Arc<AggregationStore>;

#[derive(Serialize, Deserialize)]
pub struct NodesResponse {
    pub success: bool,
    pub state: FeedState,
    pub count: usize,
    pub pnodes: Vec<CanonicalNodeRecord>,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub state: FeedState,
    pub stats: AggregateStats,
}

#[derive(Serialize, Deserialize)]
pub struct RegionsResponse {
    pub success: bool,
    pub state: FeedState,
    pub regions: Vec<RegionSummary>,
}

#[derive(Serialize, Deserialize)]
pub struct StorageResponse {
    pub success: bool,
    pub distribution: Vec<StorageBucket>,
    pub top: Vec<CanonicalNodeRecord>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

pub async fn list_nodes_handler(
    State(store): State<AppState>,
    Query(filter): Query<NodeFilter>,
) -> Result<Json<NodesResponse>, AggregatorError> {
    filter.validate()?;
    let state = store.current_snapshot().await.state;
    let pnodes = store.list_nodes(&filter).await;
    Ok(Json(NodesResponse { success: true, state, count: pnodes.len(), pnodes }))
}

pub async fn node_handler(
    State(store): State<AppState>,
    Path(pubkey): Path<String>,
) -> Result<Json<serde_json::Value>, AggregatorError> {
    let node = store.find_node(&pubkey).await?;
    Ok(Json(serde_json::json!({ "success": true, "node": node })))
}

pub async fn stats_handler(State(store): State<AppState>) -> Json<StatsResponse> {
    let snapshot = store.current_snapshot().await;
    Json(StatsResponse { success: true, state: snapshot.state, stats: snapshot.stats.clone() })
}

pub async fn regions_handler(State(store): State<AppState>) -> Json<RegionsResponse> {
    let snapshot = store.current_snapshot().await;
    Json(RegionsResponse {
        success: true,
        state: snapshot.state,
        regions: region_breakdown(&snapshot.records),
    })
}

pub async fn leaderboard_handler(
    State(store): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> Json<NodesResponse> {
    let snapshot = store.current_snapshot().await;
    let limit = q.limit.unwrap_or(LEADERBOARD_SIZE).max(1);
    let pnodes = leaderboard(&snapshot.records, limit);
    Json(NodesResponse { success: true, state: snapshot.state, count: pnodes.len(), pnodes })
}

pub async fn storage_handler(State(store): State<AppState>) -> Json<StorageResponse> {
    let snapshot = store.current_snapshot().await;
    Json(StorageResponse {
        success: true,
        distribution: storage_distribution(&snapshot.records),
        top: top_storage(&snapshot.records, TOP_STORAGE_SIZE),
    })
}

pub async fn health_handler(State(store): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = store.current_snapshot().await;
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "state": snapshot.state,
        "refreshedAt": snapshot.refreshed_at,
        "lastAttemptAt": snapshot.last_attempt_at,
        "lastError": snapshot.last_error,
        "refreshCount": store.refresh_count(),
        "failedRefreshes": store.failed_refreshes(),
        "seeds": snapshot.seeds,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn refresh_handler(State(store): State<AppState>) -> impl IntoResponse {
    match store.refresh().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "state": snapshot.state,
                "stats": snapshot.stats,
            })),
        ),
        Err(e) => {
            let snapshot = store.current_snapshot().await;
            (
                e.status_code(),
                Json(serde_json::json!({
                    "success": false,
                    "state": snapshot.state,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

pub fn router(store: AppState) -> Router {
    Router::new()
        .route("/api/pnodes", get(list_nodes_handler))
        .route("/api/pnodes/:pubkey", get(node_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/regions", get(regions_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/api/storage", get(storage_handler))
        .route("/api/health", get(health_handler))
        .route("/api/refresh", post(refresh_handler))
        .with_state(store)
}
