use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub new_visitor_alerts: bool,
    pub daily_reports: bool,
    pub check_in_alerts: bool,
    pub security_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            new_visitor_alerts: true,
            daily_reports: true,
            check_in_alerts: true,
            security_alerts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DashboardView {
    #[default]
    Calendar,
    List,
    Analytics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub data_retention_days: i32,
    pub auto_checkout_hours: i32,
    pub default_dashboard_view: DashboardView,
    pub system_email_recipients: Vec<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            data_retention_days: 90,
            auto_checkout_hours: 8,
            default_dashboard_view: DashboardView::Calendar,
            system_email_recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminPermissions {
    pub can_manage_admins: bool,
    pub can_view_analytics: bool,
    pub can_manage_settings: bool,
}

impl Default for AdminPermissions {
    fn default() -> Self {
        Self {
            can_manage_admins: false,
            can_view_analytics: true,
            can_manage_settings: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub department: String,
    pub title: String,
    pub timezone: String,
    pub notification_settings: Json<NotificationSettings>,
    pub system_settings: Json<SystemSettings>,
    pub permissions: Json<AdminPermissions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_column_defaults() {
        let json = serde_json::to_value(SystemSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dataRetentionDays": 90,
                "autoCheckoutHours": 8,
                "defaultDashboardView": "calendar",
                "systemEmailRecipients": []
            })
        );
        assert!(AdminPermissions::default().can_view_analytics);
        assert!(NotificationSettings::default().security_alerts);
    }
}
