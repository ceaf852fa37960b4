use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use serde_json::Value;
use yieldlens_api::AppState;
use yieldlens_api::dto::{IngestTriggerRequest, PoolListQuery, SimulationQuery};
use yieldlens_api::handlers;
use yieldlens_db::{CanonicalStore, MemoryStore};
use yieldlens_ingest::{AdminGate, IngestionRunner, Scheduler, SchedulerConfig};
use yieldlens_kpi::{AnalyticsService, AutopilotConfig, ScoringConfig};
use yieldlens_metrics::IngestMetrics;
use yieldlens_providers::MockProvider;

const TOKEN: &str = "s3cret";
const AAVE_POOL: &str = "0x98c23e9d8f34fefb1b7bd6a91b7ff122f4e16f5c";

fn state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let runner = Arc::new(IngestionRunner::new(
        Arc::new(MockProvider::default()),
        store.clone(),
        IngestMetrics::new(),
    ));
    let scheduler = Arc::new(Scheduler::new(runner, SchedulerConfig::default()).unwrap());
    let admin = Arc::new(AdminGate::new(TOKEN, scheduler.clone()).unwrap());
    let analytics = Arc::new(AnalyticsService::new(
        store.clone(),
        ScoringConfig::default(),
        AutopilotConfig::default(),
    ));
    let state = AppState {
        analytics,
        admin,
        scheduler,
        feed_interval: Duration::from_millis(250),
    };
    (state, store)
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn trigger(state: &AppState, token: &str, target: &str) -> Response {
    handlers::trigger_ingest(
        State(state.clone()),
        Ok(TypedHeader(Authorization::bearer(token).unwrap())),
        Some(Json(IngestTriggerRequest {
            target: target.to_string(),
        })),
    )
    .await
    .into_response()
}

#[tokio::test]
async fn test_unauthorized_trigger_writes_nothing() {
    let (state, store) = state();

    let response = trigger(&state, "wrong", "all").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "unauthorized");

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.raw_ingests, 0);
    assert_eq!(counts.snapshots, 0);
}

#[tokio::test]
async fn test_trigger_then_read() {
    let (state, _store) = state();

    let response = trigger(&state, TOKEN, "all").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let runs = body["data"]["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|run| run["outcome"] == "completed"));

    let response = handlers::list_pools(State(state.clone()), Query(PoolListQuery::default()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    // morpho-blue sits below the default TVL floor
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["pool"]["protocol"] != "morpho-blue"));

    let response = handlers::get_pool(
        State(state.clone()),
        Path((
            "aave-v3".to_string(),
            "ethereum".to_string(),
            AAVE_POOL.to_uppercase().replace("0X", "0x"),
        )),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["data"]["history"].as_array().unwrap().is_empty());
    assert!(body["data"]["scores"].is_object());

    let status = handlers::ingest_status(State(state.clone())).await.into_response();
    let body = body_json(status).await;
    let targets = body["data"]["targets"].as_array().unwrap();
    assert!(targets.iter().all(|t| t["fetch_count"] == 1));
}

#[tokio::test]
async fn test_unknown_pool_is_404() {
    let (state, _store) = state();
    let response = handlers::get_pool(
        State(state),
        Path((
            "aave-v3".to_string(),
            "ethereum".to_string(),
            "0xdead".to_string(),
        )),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_requests() {
    let (state, _store) = state();

    let response = handlers::list_pools(
        State(state.clone()),
        Query(PoolListQuery {
            sort_by: Some("color".to_string()),
            order: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = handlers::simulate(
        State(state.clone()),
        Query(SimulationQuery {
            max_weight_per_pool: Some("1.5".to_string()),
            ..Default::default()
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = handlers::simulate(
        State(state.clone()),
        Query(SimulationQuery {
            cooldown_secs: Some(i64::MAX),
            ..Default::default()
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = trigger(&state, TOKEN, "aave-v3").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = trigger(&state, TOKEN, "aave-v3:solana").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_simulation_on_empty_store() {
    let (state, _store) = state();
    let response = handlers::simulate(State(state), Query(SimulationQuery::default()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["summary"]["initial_value"], "1000");
    assert!(body["data"]["steps"].as_array().unwrap().is_empty());
}
