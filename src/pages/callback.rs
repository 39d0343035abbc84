use actix_web::{delete, http::StatusCode, post, web, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    auth::N8nCaller,
    model::{ApplicationPatch, LeaveApplication, LeaveBalance},
    store::{Action, Store},
};

use super::json_response;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(callback)
        .service(forget_application)
        .service(forget_all);
}

/// n8n reports the outcome of a workflow here:
/// `{ "ok": true, "application": { "id", "status", .. }, "balance": { .. } }`
#[post("/callback")]
async fn callback(_caller: N8nCaller, store: web::Data<Store>, body: web::Json<Value>) -> HttpResponse {
    let body = body.into_inner();

    if body.get("ok").and_then(Value::as_bool) != Some(false) {
        record_callback(&store, &body);
    }

    let mut echo = json!({ "ok": true });
    if let (Some(echo), Value::Object(fields)) = (echo.as_object_mut(), body) {
        echo.extend(fields);
    }

    json_response(StatusCode::OK, &echo)
}

/// Drops one application from the local cache, e.g. after n8n deleted it
#[delete("/applications/{id}")]
async fn forget_application(_caller: N8nCaller, store: web::Data<Store>, id: web::Path<String>) -> HttpResponse {
    let id = id.into_inner();
    info!(id, "n8n removed an application");
    store.dispatch(Action::Remove(id.clone()));

    json_response(StatusCode::OK, &json!({ "ok": true, "removed": id }))
}

#[delete("/applications")]
async fn forget_all(_caller: N8nCaller, store: web::Data<Store>) -> HttpResponse {
    info!("n8n cleared the application cache");
    store.dispatch(Action::Reset);

    json_response(StatusCode::OK, &json!({ "ok": true }))
}

fn record_callback(store: &Store, body: &Value) {
    if let Some(application) = body.get("application").filter(|v| !v.is_null()) {
        match serde_json::from_value::<LeaveApplication>(application.clone()) {
            Ok(application) => {
                info!(id = %application.id, status = ?application.status, "n8n updated an application");
                store.dispatch(Action::Upsert(application));
            }
            Err(_) => match (
                application.get("id").and_then(Value::as_str),
                serde_json::from_value::<ApplicationPatch>(application.clone()),
            ) {
                (Some(id), Ok(patch)) => {
                    info!(id, status = ?patch.status, "n8n patched an application");
                    store.dispatch(Action::Patch { id: id.to_string(), patch });
                }
                (None, _) => warn!("n8n sent an application without `id`"),
                (_, Err(err)) => warn!(error = %err, "n8n sent an unreadable application"),
            },
        }
    }

    if let Some(balance) = body.get("balance").filter(|v| !v.is_null()) {
        match serde_json::from_value::<LeaveBalance>(balance.clone()) {
            Ok(balance) => {
                store.dispatch(Action::SetBalance(Some(balance)));
            }
            Err(err) => warn!(error = %err, "n8n sent an unreadable balance"),
        }
    }
}
