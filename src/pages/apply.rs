use actix_web::{get, http::StatusCode, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::ApiError,
    mock::MockSource,
    model::{AppliedResponse, BalanceResponse, HistoryResponse, IngestResponse, LeaveApplication, LeaveApplicationInput},
    store::{Action, Store},
    upstream::N8nClient,
    workdays::{parse_calendar_date, WorkingDayCalculator},
};

use super::json_response;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(submit)
        .service(list);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Applied,
    Balance,
    History,
}

impl View {
    fn parse(view: Option<&str>) -> Self {
        match view {
            Some("balance") => View::Balance,
            Some("history") => View::History,
            _ => View::Applied,
        }
    }

    fn fixture(&self) -> &'static str {
        match self {
            View::Applied => "applied.json",
            View::Balance => "balance.json",
            View::History => "history.json",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ViewQuery {
    view: Option<String>,
}

#[post("")]
async fn submit(
    n8n: web::Data<N8nClient>,
    store: web::Data<Store>,
    mock: web::Data<MockSource>,
    calculator: web::Data<WorkingDayCalculator>,
    payload: web::Json<LeaveApplicationInput>,
) -> Result<HttpResponse, ApiError> {
    let input = payload.into_inner().validated().map_err(ApiError::Validation)?;

    check_working_days(&calculator, &input);

    if mock.is_enabled() {
        let application = LeaveApplication::pending(input, Utc::now().fixed_offset());
        info!(id = %application.id, "Mock submission accepted");

        store.dispatch(Action::Upsert(application.clone()));

        return Ok(json_response(StatusCode::OK, &IngestResponse {
            ok: true,
            application,
            balance: None,
            message: None,
        }));
    }

    let reply = n8n.ingest(&input).await?;

    if reply.is_success() {
        record_ingest(&store, &reply.body);
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok(json_response(status, &reply.body))
}

/// The form lets employees override the computed total, so a mismatch is only worth a log line
fn check_working_days(calculator: &WorkingDayCalculator, input: &LeaveApplicationInput) {
    let (Ok(start), Ok(end)) = (parse_calendar_date(&input.start_date), parse_calendar_date(&input.end_date)) else {
        return;
    };

    let computed = calculator.count(start, end, true);
    if i64::from(computed) != input.total_working_days {
        debug!(computed, submitted = input.total_working_days, "Submitted working days differ from the calendar");
    }
}

fn record_ingest(store: &Store, body: &Value) {
    match serde_json::from_value::<IngestResponse>(body.clone()) {
        Ok(IngestResponse { ok: true, application, balance, .. }) => {
            info!(id = %application.id, "Application accepted by n8n");

            store.dispatch(Action::Upsert(application));
            if balance.is_some() {
                store.dispatch(Action::SetBalance(balance));
            }
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "n8n reply is not an ingest response, store left untouched"),
    }
}

#[get("")]
async fn list(
    store: web::Data<Store>,
    mock: web::Data<MockSource>,
    query: web::Query<ViewQuery>,
) -> Result<HttpResponse, ApiError> {
    let view = View::parse(query.view.as_deref());

    if let Some(fixture) = mock.load(view.fixture()).await {
        return Ok(json_response(StatusCode::OK, &fixture?));
    }

    let state = store.snapshot();

    let response = match view {
        View::Applied => json_response(StatusCode::OK, &AppliedResponse {
            ok: true,
            items: state.applications.into_iter().filter(|a| a.status.is_active()).collect(),
        }),
        View::Balance => json_response(StatusCode::OK, &BalanceResponse {
            ok: true,
            message: state.balance.is_none().then(|| "No balance available yet".to_string()),
            balance: state.balance,
        }),
        View::History => json_response(StatusCode::OK, &HistoryResponse {
            ok: true,
            items: state.applications,
            next_cursor: None,
        }),
    };

    Ok(response)
}
