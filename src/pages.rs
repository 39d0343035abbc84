use actix_web::{error::JsonPayloadError, http::{header::{CacheControl, CacheDirective}, StatusCode}, web, HttpResponse};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;

mod apply;
mod callback;
mod workdays;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(json_config())
        .app_data(query_config())
        .service(web::scope("/api/apply")
            .configure(apply::config))
        .service(web::scope("/api/n8n")
            .configure(callback::config))
        .service(web::scope("/api/workdays")
            .configure(workdays::config));
}

fn json_config() -> web::JsonConfig {
    // The form posts with whatever content type the browser picks
    web::JsonConfig::default().content_type_required(false).error_handler(|err, _| {
        debug!(error = %err, "Rejected request body");

        match err {
            // Well-formed JSON with the wrong shape gets a message naming the field
            JsonPayloadError::Deserialize(err) if err.is_data() => ApiError::Validation(err.to_string()).into(),
            _ => ApiError::InvalidJson.into(),
        }
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| ApiError::InvalidQuery(err.to_string()).into())
}

/// JSON response that browsers and the service worker must never cache
fn json_response(status: StatusCode, body: &impl Serialize) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .json(body)
}
