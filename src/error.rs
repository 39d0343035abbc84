use actix_web::{body, http::{header::{CacheControl, CacheDirective}, StatusCode}, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::{mock::MockError, upstream::UpstreamError, workdays::WorkdayError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidJson,
    #[error("{0}")]
    InvalidQuery(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Calendar(#[from] WorkdayError),
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Mock(#[from] MockError),
}

impl actix_web::error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .json(json!({ "ok": false, "message": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::InvalidQuery(_) | ApiError::Validation(_) | ApiError::Calendar(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(UpstreamError::MissingIngestUrl | UpstreamError::MissingSnapshotUrl) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Mock(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
