use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::visit::{NotificationPreferences, Visit};
use crate::utils::validation::not_blank;

fn default_duration() -> i32 {
    60
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitPayload {
    #[validate(custom(function = "not_blank", message = "Purpose is required"))]
    pub purpose: String,
    pub visit_date: DateTime<Utc>,
    #[serde(default = "default_duration")]
    #[validate(range(min = 15, message = "Duration must be at least 15 minutes"))]
    pub expected_duration: i32,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub host_id: Option<Uuid>,
    pub notification_preferences: Option<NotificationPreferences>,
}

impl CreateVisitPayload {
    pub fn company(&self) -> Option<String> {
        trimmed(self.company.as_deref())
    }

    pub fn notes(&self) -> Option<String> {
        trimmed(self.notes.as_deref())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    #[validate(length(min = 1, message = "QR code is required"))]
    pub qr_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesPayload {
    pub notification_preferences: PreferencesPatch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVisit {
    #[serde(flatten)]
    pub visit: Visit,
    pub is_upcoming: bool,
    pub is_active: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MyVisitsResponse {
    pub upcoming_visits: Vec<MyVisit>,
    pub active_visits: Vec<MyVisit>,
    pub completed_visits: Vec<MyVisit>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeStats {
    pub valid_qr_codes: i64,
    pub expired_qr_codes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSummary {
    pub total_visitors: i64,
    pub active_visitors: i64,
    pub scheduled_visitors: i64,
    pub checked_out_visitors: i64,
    pub cancelled_visitors: i64,
    pub upcoming_visits: i64,
    pub completed_visits: i64,
    pub total_visits: i64,
    pub qr_code_stats: QrCodeStats,
}
