use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Failures that surface as an HTTP error response. Remote listing and fetch
/// failures are handled locally by the callers and never reach this type.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("template error: {0}")]
    Template(#[from] upon::Error),
    #[error("unknown template: {0}")]
    MissingTemplate(String),
}

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
