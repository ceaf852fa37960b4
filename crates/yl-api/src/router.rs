use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};

use utoipa::OpenApi as OpenApiT;
use utoipa_swagger_ui::SwaggerUi;

use crate::{AppState, handlers};

pub fn api_router<T: OpenApiT>(_state: AppState) -> Router<AppState> {
    let open_api = T::openapi();

    let pools_router = Router::new()
        .route("/", get(handlers::list_pools))
        .route(
            "/{protocol}/{chain}/{pool_address}",
            get(handlers::get_pool),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/v1/pools", pools_router)
        .route("/v1/simulation", get(handlers::simulate))
        .route("/v1/live", get(handlers::live_feed))
        .route("/v1/admin/ingest", post(handlers::trigger_ingest))
        .route("/v1/ingest/status", get(handlers::ingest_status))
        .merge(SwaggerUi::new("/v1/docs").url("/v1/docs/openapi.json", open_api))
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
