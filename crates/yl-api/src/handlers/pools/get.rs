use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use yieldlens_types::PoolKey;

use crate::{
    AppState,
    dto::{ApiResponse, PoolDetailResponse},
    errors::ApiError,
};

#[utoipa::path(
    get,
    path = "/pools/{protocol}/{chain}/{pool_address}",
    tag = "Pools",
    params(
        ("protocol" = String, Path, description = "Protocol slug, e.g. aave-v3"),
        ("chain" = String, Path, description = "Chain slug, e.g. ethereum"),
        ("pool_address" = String, Path, description = "Pool contract address")
    ),
    responses(
        (status = 200, description = "Pool metadata, full snapshot history and current scores", body = PoolDetailResponse),
        (status = 404, description = "Pool not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_pool(
    State(state): State<AppState>,
    Path((protocol, chain, pool_address)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = PoolKey::new(protocol, chain, pool_address);
    let detail = state.analytics.pool_detail(&key).await?;
    Ok(Json(ApiResponse::ok(PoolDetailResponse::from(detail))))
}
