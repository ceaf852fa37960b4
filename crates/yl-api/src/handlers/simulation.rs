use std::str::FromStr;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use yieldlens_kpi::ConstraintOverrides;
use yieldlens_types::TimeWindow;

use crate::{
    AppState,
    dto::{ApiResponse, SimulationQuery, SimulationResponse},
    errors::ApiError,
};

#[utoipa::path(
    get,
    path = "/simulation",
    tag = "Autopilot",
    params(SimulationQuery),
    responses(
        (status = 200, description = "Allocation plan, portfolio value series and summary", body = SimulationResponse),
        (status = 400, description = "Invalid constraints or window"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn simulate(
    State(state): State<AppState>,
    Query(query): Query<SimulationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let overrides = ConstraintOverrides {
        min_tvl_usd: parse_decimal("min_tvl_usd", query.min_tvl_usd.as_deref())?,
        max_weight_per_pool: parse_decimal(
            "max_weight_per_pool",
            query.max_weight_per_pool.as_deref(),
        )?,
        cooldown_secs: query.cooldown_secs,
    };
    let window = parse_window(query.start.as_deref(), query.end.as_deref(), Utc::now())?;

    let simulation = state.analytics.simulate(&overrides, window).await?;
    Ok(Json(ApiResponse::ok(SimulationResponse::from(&simulation))))
}

fn parse_decimal(name: &str, raw: Option<&str>) -> Result<Option<Decimal>, ApiError> {
    raw.map(|value| {
        Decimal::from_str(value.trim())
            .map_err(|e| ApiError::BadRequest(format!("Invalid {name} '{value}': {e}")))
    })
    .transpose()
}

fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ApiError::BadRequest(format!("Invalid {name} '{raw}': {e}")))
}

/// A missing bound is open: the start falls back to the earliest representable time
/// and the end to `now`.
fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<TimeWindow>, ApiError> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    let start = start
        .map(|raw| parse_timestamp("start", raw))
        .transpose()?
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = end
        .map(|raw| parse_timestamp("end", raw))
        .transpose()?
        .unwrap_or(now);
    TimeWindow::new(start, end)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}
