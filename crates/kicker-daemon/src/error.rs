use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kicker_match::MatchError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("database not configured")]
    DbUnavailable,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Match(e) => {
                let status = match e {
                    MatchError::NoActiveMatch => StatusCode::CONFLICT,
                    MatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    MatchError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    MatchError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.code())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::DbUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "DB_UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_errors_map_to_distinct_statuses() {
        let cases = [
            (MatchError::NoActiveMatch, StatusCode::CONFLICT),
            (
                MatchError::InvalidRequest("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MatchError::SourceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                MatchError::PersistenceFailure("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, want) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), want);
        }
    }

    #[test]
    fn boundary_errors() {
        assert_eq!(
            ApiError::DbUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::NotFound("player 9".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
