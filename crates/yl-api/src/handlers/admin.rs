use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use chrono::Utc;
use yieldlens_types::TargetSelector;

use crate::{
    AppState,
    dto::{
        ApiResponse, IngestRunItem, IngestStatusResponse, IngestTriggerRequest,
        IngestTriggerResponse, TargetStatusItem,
    },
    errors::ApiError,
};

#[utoipa::path(
    post,
    path = "/admin/ingest",
    tag = "Admin",
    request_body(content = IngestTriggerRequest, description = "Defaults to all targets"),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Outcome of every triggered cycle", body = IngestTriggerResponse),
        (status = 400, description = "Malformed target"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Target is not configured")
    )
)]
pub async fn trigger_ingest(
    State(state): State<AppState>,
    auth: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    body: Option<Json<IngestTriggerRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = auth.ok().map(|TypedHeader(Authorization(bearer))| bearer);
    let credential = credential.as_ref().map(Bearer::token);

    // Reject before the target is even looked at.
    state.admin.verify(credential)?;

    let target = body.map_or_else(|| "all".to_string(), |Json(req)| req.target);
    let selector: TargetSelector = target
        .parse()
        .map_err(|e: yieldlens_types::ConfigError| ApiError::BadRequest(e.to_string()))?;

    let runs = state.admin.trigger(credential, &selector, Utc::now()).await?;
    let runs = runs.into_iter().map(IngestRunItem::from).collect();

    Ok(Json(ApiResponse::ok(IngestTriggerResponse { runs })))
}

#[utoipa::path(
    get,
    path = "/ingest/status",
    tag = "Admin",
    responses(
        (status = 200, description = "Throttle state of every configured target", body = IngestStatusResponse)
    )
)]
pub async fn ingest_status(State(state): State<AppState>) -> impl IntoResponse {
    let targets = state
        .scheduler
        .status()
        .into_iter()
        .map(TargetStatusItem::from)
        .collect();
    Json(ApiResponse::ok(IngestStatusResponse { targets }))
}
