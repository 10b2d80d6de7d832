use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address is not a contract: {0}")]
    NotAContract(String),

    #[error("Verified source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Explorer error: {0}")]
    Explorer(String),

    #[error("Blockchain error: {0}")]
    Blockchain(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Rate limited")]
    RateLimited { retry_after: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Stable machine-readable code, also used as the `code` field of error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::InvalidAddress(_) => "invalid_address",
            AuditError::NotAContract(_) => "not_a_contract",
            AuditError::SourceUnavailable(_) => "source_unavailable",
            AuditError::Explorer(_) => "explorer_error",
            AuditError::Blockchain(_) => "blockchain_error",
            AuditError::Generation(_) => "generation_error",
            AuditError::RateLimited { .. } => "rate_limited",
            AuditError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuditError::InvalidAddress(_) | AuditError::NotAContract(_) => StatusCode::BAD_REQUEST,
            AuditError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuditError::SourceUnavailable(_)
            | AuditError::Explorer(_)
            | AuditError::Blockchain(_)
            | AuditError::Generation(_)
            | AuditError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            retry_after: match self {
                AuditError::RateLimited { retry_after } => Some(retry_after),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        AuditError::Explorer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(
            AuditError::InvalidAddress("0x12".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuditError::NotAContract("0x00".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_pipeline_failures_map_to_server_error() {
        let err = AuditError::SourceUnavailable("not verified".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "source_unavailable");
    }

    #[test]
    fn test_rate_limited_status() {
        let err = AuditError::RateLimited { retry_after: 60 };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
