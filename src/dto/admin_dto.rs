use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::common::Pagination;
use crate::models::admin::DashboardView;
use crate::models::user::Role;
use crate::models::visit::{VisitDetail, VisitStatus};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page whose offset still fits in an `i64` at the largest page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VisitorListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<VisitStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl VisitorListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Substring pattern for `ILIKE ... ESCAPE '\'`; the term matches literally.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorListResponse {
    pub visitors: Vec<VisitDetail>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurposeCount {
    pub purpose: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HourCount {
    pub hour: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: VisitStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_visitors: i64,
    pub top_purposes: Vec<PurposeCount>,
    pub average_daily_visitors: f64,
    pub visits_by_hour: Vec<HourCount>,
    pub status_breakdown: Vec<StatusCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_visitor_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_reports: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_alerts: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Retention must be at least one day"))]
    pub data_retention_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 24, message = "Auto checkout must be between 1 and 24 hours"))]
    pub auto_checkout_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dashboard_view: Option<DashboardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_email_recipients: Option<Vec<String>>,
}

/// Partial settings, merged key-by-key into the stored JSONB documents.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    #[validate(nested)]
    pub notification_settings: Option<NotificationSettingsPatch>,
    #[validate(nested)]
    pub system_settings: Option<SystemSettingsPatch>,
}

impl SettingsPayload {
    pub fn notification_json(&self) -> serde_json::Value {
        patch_json(&self.notification_settings)
    }

    pub fn system_json(&self) -> serde_json::Value {
        patch_json(&self.system_settings)
    }
}

fn patch_json<T: Serialize>(patch: &Option<T>) -> serde_json::Value {
    patch
        .as_ref()
        .and_then(|p| serde_json::to_value(p).ok())
        .unwrap_or_else(|| serde_json::json!({}))
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub photo: Option<String>,
    pub department: String,
    pub title: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total_visitors: i64,
    pub active_visitors: i64,
    pub scheduled_visitors: i64,
    pub checked_out_visitors: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub total_visitors: i64,
    pub checked_in: i64,
    pub checked_out: i64,
    pub scheduled: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today: PeriodStats,
    pub this_week: PeriodStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub today_total: i64,
    pub checked_in: i64,
    pub pending: i64,
    pub completed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_clamps_paging() {
        let q = VisitorListQuery {
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_SIZE);
        assert_eq!(VisitorListQuery::default().limit(), 10);
    }

    #[test]
    fn huge_page_offset_does_not_overflow() {
        let q = VisitorListQuery {
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        };
        assert_eq!(q.page(), MAX_PAGE);
        assert_eq!(q.offset(), (MAX_PAGE - 1) * 100);

        let q = VisitorListQuery {
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn search_wildcards_are_escaped() {
        let q = VisitorListQuery {
            search: Some("100%_off\\".into()),
            ..Default::default()
        };
        assert_eq!(q.search_pattern().as_deref(), Some("%100\\%\\_off\\\\%"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let q = VisitorListQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_pattern(), None);
        let q = VisitorListQuery {
            search: Some(" ada ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_pattern().as_deref(), Some("%ada%"));
    }

    #[test]
    fn settings_patch_keeps_only_supplied_keys() {
        let payload: SettingsPayload = serde_json::from_value(serde_json::json!({
            "systemSettings": {"autoCheckoutHours": 4, "defaultDashboardView": "list"}
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.notification_json(), serde_json::json!({}));
        assert_eq!(
            payload.system_json(),
            serde_json::json!({"autoCheckoutHours": 4, "defaultDashboardView": "list"})
        );
    }

    #[test]
    fn settings_patch_validates_nested_ranges() {
        let payload: SettingsPayload = serde_json::from_value(serde_json::json!({
            "systemSettings": {"autoCheckoutHours": 48}
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn status_filter_parses_kebab_case() {
        let q: VisitorListQuery =
            serde_json::from_value(serde_json::json!({"status": "checked-in"})).unwrap();
        assert_eq!(q.status, Some(VisitStatus::CheckedIn));
    }
}
