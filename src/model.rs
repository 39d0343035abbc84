use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::workdays;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    Annual,
    Medical,
    Others,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Whether the application still shows up in the "current applied" list
    pub fn is_active(&self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_date_order"))]
pub struct LeaveApplicationInput {
    #[validate(length(min = 1, message = "Select at least one group"))]
    pub groups: Vec<String>,

    #[validate(length(min = 2, max = 80))]
    pub applicant_name: String,
    #[validate(length(min = 2, max = 80))]
    pub designation: String,
    #[validate(length(min = 2, max = 80))]
    pub department: String,

    #[validate(length(min = 1, message = "Select at least one leave type"))]
    pub leave_types: Vec<LeaveType>,

    #[validate(length(min = 3, max = 500))]
    pub reason: String,

    #[validate(custom(function = "check_iso_date"))]
    pub start_date: String,
    #[validate(custom(function = "check_iso_date"))]
    pub end_date: String,

    // <input type="number"> may post the value as a string
    #[serde(deserialize_with = "coerce_int")]
    #[validate(range(min = 1))]
    pub total_working_days: i64,

    #[validate(length(min = 5, max = 200))]
    pub contact_address: String,
    #[validate(custom(function = "check_phone"))]
    pub contact_tel: String,

    #[validate(custom(function = "check_iso_date"))]
    pub date_request: String,
}

impl LeaveApplicationInput {
    /// Trims every free-text field, the same way the form schema does before checking lengths
    pub fn normalized(mut self) -> Self {
        fn trim(value: &mut String) {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }

        self.groups.iter_mut().for_each(trim);
        trim(&mut self.applicant_name);
        trim(&mut self.designation);
        trim(&mut self.department);
        trim(&mut self.reason);
        trim(&mut self.start_date);
        trim(&mut self.end_date);
        trim(&mut self.contact_address);
        trim(&mut self.contact_tel);
        trim(&mut self.date_request);

        self
    }

    /// Normalizes then validates, producing a single readable message on failure
    pub fn validated(self) -> Result<Self, String> {
        let input = self.normalized();
        input.validate().map_err(|errors| describe(&errors))?;
        Ok(input)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    pub id: String,
    #[serde(default)]
    pub status: LeaveStatus,
    pub created_at: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub input: LeaveApplicationInput,
}

impl LeaveApplication {
    pub fn pending(input: LeaveApplicationInput, created_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: LeaveStatus::Pending,
            created_at,
            input,
        }
    }
}

/// Partial update n8n sends when only some fields of an application change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    pub status: Option<LeaveStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_working_days: Option<i64>,
    pub reason: Option<String>,
}

impl ApplicationPatch {
    pub fn apply_to(&self, application: &mut LeaveApplication) {
        if let Some(status) = self.status {
            application.status = status;
        }
        if let Some(start_date) = &self.start_date {
            application.input.start_date = start_date.clone();
        }
        if let Some(end_date) = &self.end_date {
            application.input.end_date = end_date.clone();
        }
        if let Some(total_working_days) = self.total_working_days {
            application.input.total_working_days = total_working_days;
        }
        if let Some(reason) = &self.reason {
            application.input.reason = reason.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub annual: f64,
    pub medical: f64,
    pub others: f64,
    pub last_updated_at: DateTime<FixedOffset>,
}

/// Reply of the n8n ingest webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub application: LeaveApplication,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<LeaveBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedResponse {
    pub ok: bool,
    pub items: Vec<LeaveApplication>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<LeaveBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub ok: bool,
    pub items: Vec<LeaveApplication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Applications and balance as n8n currently knows them
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub items: Vec<LeaveApplication>,
    pub balance: Option<LeaveBalance>,
}

fn coerce_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(value) => Ok(value),
        NumberOrString::Float(value) if value.fract() == 0.0 => Ok(value as i64),
        NumberOrString::Float(value) => Err(de::Error::custom(format!("expected an integer, got {value}"))),
        NumberOrString::Text(value) => value.trim().parse()
            .map_err(|_| de::Error::custom(format!("expected an integer, got `{value}`"))),
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn check_iso_date(value: &str) -> Result<(), ValidationError> {
    workdays::parse_calendar_date(value)
        .map(|_| ())
        .map_err(|_| error("iso_date", "Invalid date (YYYY-MM-DD)"))
}

fn check_phone(value: &str) -> Result<(), ValidationError> {
    let allowed = value.chars().all(|c| c.is_ascii_digit() || c.is_whitespace() || "+()-.".contains(c));
    let length = value.chars().count();

    if !allowed || !(6..=20).contains(&length) {
        return Err(error("phone", "Invalid phone number"));
    }

    Ok(())
}

fn check_date_order(input: &LeaveApplicationInput) -> Result<(), ValidationError> {
    // Both dates are already known to be YYYY-MM-DD here, so they order lexically
    if input.start_date > input.end_date {
        return Err(error("date_order", "End date cannot be earlier than start date"));
    }

    Ok(())
}

/// Flattens validator output into `field: message; field: message`, sorted by field
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts = errors.field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = if field == "__all__" { Cow::Borrowed("endDate") } else { to_camel_case(&field) };
            errors.iter()
                .map(move |error| match &error.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: invalid ({})", error.code),
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    parts.sort();
    parts.join("; ")
}

fn to_camel_case(field: &str) -> Cow<'static, str> {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;

    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    pub(crate) fn sample_input() -> LeaveApplicationInput {
        LeaveApplicationInput {
            groups: vec!["Tri-e Marketing sdn bhd".to_string()],
            applicant_name: "Aisyah".to_string(),
            designation: "Engineer".to_string(),
            department: "Support".to_string(),
            leave_types: vec![LeaveType::Annual],
            reason: "Family trip".to_string(),
            start_date: "2025-06-02".to_string(),
            end_date: "2025-06-08".to_string(),
            total_working_days: 5,
            contact_address: "12 Jalan Ampang".to_string(),
            contact_tel: "+60 12-345 6789".to_string(),
            date_request: "2025-05-20".to_string(),
        }
    }

    pub(crate) fn sample_application(id: &str, created_at: &str) -> LeaveApplication {
        LeaveApplication {
            id: id.to_string(),
            status: LeaveStatus::Pending,
            created_at: DateTime::parse_from_rfc3339(created_at).unwrap(),
            input: sample_input(),
        }
    }

    #[test]
    fn test_valid_input() {
        assert_eq!(sample_input().validated(), Ok(sample_input()));
    }

    #[test]
    fn test_input_is_trimmed() {
        let mut input = sample_input();
        input.applicant_name = "  Aisyah ".to_string();
        input.start_date = " 2025-06-02".to_string();

        let input = input.validated().unwrap();
        assert_eq!(input.applicant_name, "Aisyah");
        assert_eq!(input.start_date, "2025-06-02");
    }

    #[test]
    fn test_whitespace_only_name_is_too_short() {
        let mut input = sample_input();
        input.applicant_name = "   A   ".to_string();

        let message = input.validated().unwrap_err();
        assert!(message.starts_with("applicantName:"), "{message}");
    }

    #[test]
    fn test_end_before_start() {
        let mut input = sample_input();
        input.start_date = "2025-06-08".to_string();
        input.end_date = "2025-06-02".to_string();

        assert_eq!(input.validated(), Err("endDate: End date cannot be earlier than start date".to_string()));
    }

    #[test]
    fn test_field_errors() {
        let mut input = sample_input();
        input.groups.clear();
        input.leave_types.clear();
        input.start_date = "2025-6-2".to_string();
        input.total_working_days = 0;
        input.contact_tel = "call me".to_string();

        let message = input.validated().unwrap_err();
        assert!(message.contains("groups: Select at least one group"), "{message}");
        assert!(message.contains("leaveTypes: Select at least one leave type"), "{message}");
        assert!(message.contains("startDate: Invalid date (YYYY-MM-DD)"), "{message}");
        assert!(message.contains("totalWorkingDays: invalid (range)"), "{message}");
        assert!(message.contains("contactTel: Invalid phone number"), "{message}");
    }

    #[test]
    fn test_phone() {
        assert!(check_phone("0123456789").is_ok());
        assert!(check_phone("(03) 1234-5678").is_ok());
        assert!(check_phone("12345").is_err());
        assert!(check_phone("012345678901234567890").is_err());
        assert!(check_phone("012-ABC-1234").is_err());
    }

    #[test]
    fn test_total_working_days_coercion() {
        let mut value = serde_json::to_value(sample_input()).unwrap();

        value["totalWorkingDays"] = json!("3");
        let input: LeaveApplicationInput = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(input.total_working_days, 3);

        value["totalWorkingDays"] = json!(4.0);
        let input: LeaveApplicationInput = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(input.total_working_days, 4);

        value["totalWorkingDays"] = json!("2.5");
        assert!(serde_json::from_value::<LeaveApplicationInput>(value).is_err());
    }

    #[test]
    fn test_application_wire_format() {
        let application = sample_application("a-1", "2025-05-20T09:30:00+08:00");
        let value = serde_json::to_value(&application).unwrap();

        assert_eq!(value["id"], "a-1");
        assert_eq!(value["status"], "Pending");
        assert_eq!(value["applicantName"], "Aisyah");
        assert_eq!(value["leaveTypes"], json!(["Annual"]));
        assert_eq!(value["totalWorkingDays"], 5);

        let mut value = value;
        value.as_object_mut().unwrap().remove("status");
        let parsed: LeaveApplication = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, application);
    }

    #[test]
    fn test_patch() {
        let mut application = sample_application("a-1", "2025-05-20T09:30:00+08:00");
        let patch: ApplicationPatch = serde_json::from_value(json!({ "status": "Approved", "totalWorkingDays": 4 })).unwrap();

        patch.apply_to(&mut application);
        assert_eq!(application.status, LeaveStatus::Approved);
        assert_eq!(application.input.total_working_days, 4);
        assert_eq!(application.input.reason, "Family trip");
    }
}
