// web-server/src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use questline_common::{AuthError, OnboardingError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(AuthError::Parse(_)) => "invalid_init_data",
            ApiError::Auth(AuthError::Verification(_)) => "verification_failed",
            ApiError::Auth(AuthError::Mapping(_)) => "mapping_failed",
            ApiError::Onboarding(OnboardingError::InsufficientContent { .. }) => "insufficient_content",
            ApiError::Onboarding(OnboardingError::PersistenceConflict(_)) => "persistence_conflict",
            ApiError::Onboarding(OnboardingError::PersistenceUnavailable(_)) => "persistence_unavailable",
            ApiError::Onboarding(OnboardingError::Interrupted(_)) => "onboarding_interrupted",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::Verification(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Onboarding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Server-side failures keep their details in the logs
        let reason = match self {
            ApiError::Onboarding(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "reason": reason,
        }))
    }
}
