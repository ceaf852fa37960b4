use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use yieldlens_ingest::IngestError;
use yieldlens_kpi::AnalyticsError;

use crate::dto::{ApiResponse, ErrorCode};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error")]
    InternalServerError,
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::PoolNotFound(key) => Self::NotFound(format!("Pool {key} not found")),
            AnalyticsError::InvalidConstraints(e) => Self::BadRequest(e.to_string()),
            AnalyticsError::Kpi(e) => {
                tracing::error!(error = %e, "KPI computation failed");
                Self::InternalServerError
            }
            // Don't expose internal database details to clients
            AnalyticsError::Database(e) => {
                tracing::error!(error = %e, "Analytics read failed");
                Self::InternalServerError
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Unauthorized => Self::Unauthorized("Invalid admin credential".to_string()),
            IngestError::UnknownTarget(target) => {
                Self::NotFound(format!("Ingestion target {target} is not configured"))
            }
            IngestError::Config(e) => Self::BadRequest(e.to_string()),
            IngestError::Provider(e) => Self::ServiceUnavailable(e.to_string()),
            IngestError::Database(e) => {
                tracing::error!(error = %e, "Ingestion commit failed");
                Self::InternalServerError
            }
        }
    }
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::BadRequest(_) => ErrorCode::InvalidRequest,
            Self::ServiceUnavailable(_) => ErrorCode::ProviderUnavailable,
            Self::InternalServerError => ErrorCode::Internal,
        }
    }

    /// Message shown to clients. Internal failures stay opaque.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::InternalServerError => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let response: ApiResponse<()> = ApiResponse::from(&self);
        (self.status_code(), Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use yieldlens_types::{ConfigError, PoolKey};

    use super::*;

    #[test]
    fn test_analytics_error_mapping() {
        let not_found: ApiError =
            AnalyticsError::PoolNotFound(PoolKey::new("aave-v3", "ethereum", "0xAB")).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert!(not_found.to_string().contains("aave-v3:ethereum:0xab"));

        let invalid: ApiError =
            AnalyticsError::InvalidConstraints(ConfigError::invalid("max_weight_per_pool", "> 1"))
                .into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_ingest_error_mapping() {
        assert_eq!(
            ApiError::from(IngestError::Unauthorized).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(IngestError::UnknownTarget("x:y".into())).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = ApiError::InternalServerError.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::InternalServerError.code(), ErrorCode::Internal);
        assert_eq!(
            ApiError::InternalServerError.public_message(),
            "Internal server error"
        );
    }
}
