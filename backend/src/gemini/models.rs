use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use shared::{ErrorKind, ErrorResponse, classify_failure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredential,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Upstream answered {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::MissingCredential => ErrorKind::MissingCredential,
            RelayError::Upstream { status, body } => classify_failure(*status, body),
            RelayError::HttpError(_) | RelayError::JsonError(_) => ErrorKind::UnknownFailure,
        }
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            kind,
            message: kind.message().to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub credential_configured: bool,
}
