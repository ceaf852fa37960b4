use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use yieldlens_kpi::{LeaderboardField, SortOrder, sort_leaderboard};

use crate::{
    AppState,
    dto::{ApiResponse, PoolListItem, PoolListQuery, PoolListResponse},
    errors::ApiError,
};

#[utoipa::path(
    get,
    path = "/pools",
    tag = "Pools",
    params(PoolListQuery),
    responses(
        (status = 200, description = "Latest metrics and scores of every pool above the TVL floor", body = PoolListResponse),
        (status = 400, description = "Unknown sort column or order"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_pools(
    State(state): State<AppState>,
    Query(query): Query<PoolListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let field = match query.sort_by.as_deref() {
        Some(raw) => raw
            .parse::<LeaderboardField>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown sort_by column: {raw}")))?,
        None => LeaderboardField::default(),
    };
    let order = match query.order.as_deref() {
        Some(raw) => raw
            .parse::<SortOrder>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown order: {raw}")))?,
        None => SortOrder::default(),
    };

    let leaderboard = state.analytics.leaderboard().await?;

    // The cached leaderboard is already ranked by risk-adjusted score.
    let items = if field == LeaderboardField::RiskAdjustedScore && order == SortOrder::Desc {
        leaderboard.iter().map(PoolListItem::from).collect()
    } else {
        let mut entries = leaderboard.to_vec();
        sort_leaderboard(&mut entries, field, order);
        entries.iter().map(PoolListItem::from).collect()
    };

    Ok(Json(ApiResponse::ok(PoolListResponse { items })))
}
