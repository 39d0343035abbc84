use actix_web::{get, http::StatusCode, web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    consts,
    error::ApiError,
    workdays::{parse_calendar_date, today_iso, HolidaySet, WeekendPolicy, WorkingDayCalculator},
};

use super::json_response;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(count)
        .service(today);
}

#[derive(Debug, Deserialize)]
struct CountQuery {
    start: String,
    end: String,
    /// Report at least one day; the leave form asks for this on every date change
    #[serde(default)]
    clamp: bool,
    /// Weekday indices overriding the configured weekend, e.g. `5,6`
    weekend: Option<String>,
    /// Holidays on top of the configured ones, comma separated
    holidays: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    ok: bool,
    start: NaiveDate,
    end: NaiveDate,
    working_days: u32,
    clamp_to_one: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodayResponse {
    ok: bool,
    today: String,
    time_zone: String,
}

#[get("")]
async fn count(calculator: web::Data<WorkingDayCalculator>, query: web::Query<CountQuery>) -> Result<HttpResponse, ApiError> {
    let start = parse_calendar_date(&query.start)?;
    let end = parse_calendar_date(&query.end)?;

    if (end - start).num_days().abs() > consts::MAX_COUNT_SPAN_DAYS {
        return Err(ApiError::InvalidQuery(format!(
            "Range is wider than {} days",
            consts::MAX_COUNT_SPAN_DAYS
        )));
    }

    let weekend = query.weekend.as_deref()
        .map(str::parse::<WeekendPolicy>)
        .transpose()?;
    let holidays = query.holidays.as_deref()
        .map(str::parse::<HolidaySet>)
        .transpose()?
        .unwrap_or_default();

    let working_days = calculator.count_with(start, end, weekend.as_ref(), &holidays, query.clamp);

    Ok(json_response(StatusCode::OK, &CountResponse {
        ok: true,
        start: start.min(end),
        end: start.max(end),
        working_days,
        clamp_to_one: query.clamp,
    }))
}

#[get("/today")]
async fn today(calculator: web::Data<WorkingDayCalculator>) -> HttpResponse {
    json_response(StatusCode::OK, &TodayResponse {
        ok: true,
        today: today_iso(&calculator.time_zone()),
        time_zone: calculator.time_zone().name().to_string(),
    })
}
