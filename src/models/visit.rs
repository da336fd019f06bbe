use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visit_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum VisitStatus {
    Scheduled,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitEvent {
    CheckIn,
    CheckOut,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} a visit that is {from}")]
pub struct IllegalTransition {
    pub from: VisitStatus,
    pub event: VisitEvent,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 4] = [
        VisitStatus::Scheduled,
        VisitStatus::CheckedIn,
        VisitStatus::CheckedOut,
        VisitStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::CheckedIn => "checked-in",
            VisitStatus::CheckedOut => "checked-out",
            VisitStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, VisitStatus::CheckedOut | VisitStatus::Cancelled)
    }

    pub fn transition(self, event: VisitEvent) -> Result<VisitStatus, IllegalTransition> {
        match (self, event) {
            (VisitStatus::Scheduled, VisitEvent::CheckIn) => Ok(VisitStatus::CheckedIn),
            (VisitStatus::CheckedIn, VisitEvent::CheckOut) => Ok(VisitStatus::CheckedOut),
            (VisitStatus::Scheduled, VisitEvent::Cancel) => Ok(VisitStatus::Cancelled),
            (from, event) => Err(IllegalTransition { from, event }),
        }
    }
}

impl VisitEvent {
    /// The only state this event may be applied to.
    pub fn source(self) -> VisitStatus {
        match self {
            VisitEvent::CheckIn | VisitEvent::Cancel => VisitStatus::Scheduled,
            VisitEvent::CheckOut => VisitStatus::CheckedIn,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisitEvent::CheckIn => "check in",
            VisitEvent::CheckOut => "check out",
            VisitEvent::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for VisitEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VisitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisitStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown visit status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub host_id: Option<Uuid>,
    pub company: Option<String>,
    pub purpose: String,
    pub visit_date: DateTime<Utc>,
    pub expected_duration: i32,
    pub status: VisitStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub qr_code: Option<String>,
    pub qr_code_expiry: Option<DateTime<Utc>>,
    pub notification_preferences: Json<NotificationPreferences>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == VisitStatus::Scheduled && self.visit_date > now
    }
}

/// A visit joined with the visitor's and host's contact details.
#[derive(Debug, Clone, FromRow)]
pub struct VisitDetailRow {
    #[sqlx(flatten)]
    pub visit: Visit,
    pub visitor_first_name: String,
    pub visitor_last_name: String,
    pub visitor_email: String,
    pub visitor_phone: Option<String>,
    pub host_first_name: Option<String>,
    pub host_last_name: Option<String>,
    pub host_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetail {
    #[serde(flatten)]
    pub visit: Visit,
    pub user: UserSummary,
    pub host: Option<UserSummary>,
}

impl From<VisitDetailRow> for VisitDetail {
    fn from(row: VisitDetailRow) -> Self {
        let host = match (row.visit.host_id, row.host_first_name, row.host_last_name, row.host_email) {
            (Some(id), Some(first_name), Some(last_name), Some(email)) => Some(UserSummary {
                id,
                first_name,
                last_name,
                email,
                phone: None,
            }),
            _ => None,
        };
        Self {
            user: UserSummary {
                id: row.visit.user_id,
                first_name: row.visitor_first_name,
                last_name: row.visitor_last_name,
                email: row.visitor_email,
                phone: row.visitor_phone,
            },
            host,
            visit: row.visit,
        }
    }
}
