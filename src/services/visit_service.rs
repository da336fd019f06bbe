use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::dto::visitor_dto::{
    CreateVisitPayload, MyVisit, MyVisitsResponse, PreferencesPatch, QrCodeStats, VisitorSummary,
};
use crate::error::{Error, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::Role;
use crate::models::visit::{
    NotificationPreferences, Visit, VisitDetail, VisitDetailRow, VisitEvent, VisitStatus,
};
use crate::utils::qr_code::{QrCodec, VerifiedToken};
use crate::utils::time::db_precision;

pub(crate) const VISIT_COLUMNS: &str = "id, user_id, host_id, company, purpose, visit_date, expected_duration, status, check_in_time, check_out_time, qr_code, qr_code_expiry, notification_preferences, notes, created_at, updated_at";

/// Visits joined with visitor and host contact columns; callers append
/// their own WHERE / ORDER BY.
pub(crate) const VISIT_DETAIL_SELECT: &str = "
    SELECT v.id, v.user_id, v.host_id, v.company, v.purpose, v.visit_date,
           v.expected_duration, v.status, v.check_in_time, v.check_out_time,
           v.qr_code, v.qr_code_expiry, v.notification_preferences, v.notes,
           v.created_at, v.updated_at,
           u.first_name AS visitor_first_name, u.last_name AS visitor_last_name,
           u.email AS visitor_email, u.phone AS visitor_phone,
           h.first_name AS host_first_name, h.last_name AS host_last_name,
           h.email AS host_email
    FROM visits v
    JOIN users u ON u.id = v.user_id
    LEFT JOIN users h ON h.id = v.host_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitCounts {
    pub total: i64,
    pub scheduled: i64,
    pub checked_in: i64,
    pub checked_out: i64,
    pub cancelled: i64,
    pub upcoming: i64,
    pub valid_qr_codes: i64,
    pub expired_qr_codes: i64,
}

#[derive(Clone)]
pub struct VisitService {
    pool: PgPool,
    codec: QrCodec,
}

impl VisitService {
    pub fn new(pool: PgPool, codec: QrCodec) -> Self {
        Self { pool, codec }
    }

    pub async fn create(&self, user_id: Uuid, payload: CreateVisitPayload) -> Result<Visit> {
        if let Some(host_id) = payload.host_id {
            let host_active: Option<bool> =
                sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
                    .bind(host_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if host_active != Some(true) {
                return Err(Error::BadRequest("Host not found".to_string()));
            }
        }

        let visit_date = db_precision(payload.visit_date);
        let issued = self.codec.issue(user_id, visit_date)?;
        let preferences = payload.notification_preferences.unwrap_or_default();

        let query = format!(
            "INSERT INTO visits (
                user_id, host_id, company, purpose, visit_date, expected_duration,
                qr_code, qr_code_expiry, notification_preferences, notes
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            VISIT_COLUMNS
        );
        let visit = sqlx::query_as::<_, Visit>(&query)
            .bind(user_id)
            .bind(payload.host_id)
            .bind(payload.company())
            .bind(payload.purpose.trim())
            .bind(visit_date)
            .bind(payload.expected_duration)
            .bind(&issued.token)
            .bind(issued.expires_at)
            .bind(Json(preferences))
            .bind(payload.notes())
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(visit_id = %visit.id, user_id = %user_id, "visit registered");
        Ok(visit)
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<VisitDetail> {
        let query = format!("{} WHERE v.id = $1", VISIT_DETAIL_SELECT);
        let row = sqlx::query_as::<_, VisitDetailRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Visit not found".to_string()))?;
        Ok(row.into())
    }

    pub async fn list_all(&self) -> Result<Vec<VisitDetail>> {
        let query = format!("{} ORDER BY v.visit_date DESC", VISIT_DETAIL_SELECT);
        let rows = sqlx::query_as::<_, VisitDetailRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(VisitDetail::from).collect())
    }

    pub async fn my_visits(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<MyVisitsResponse> {
        let query = format!(
            "SELECT {} FROM visits WHERE user_id = $1 ORDER BY visit_date DESC",
            VISIT_COLUMNS
        );
        let visits = sqlx::query_as::<_, Visit>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(group_visits(visits, now))
    }

    pub async fn check_in(&self, token: &str) -> Result<VisitDetail> {
        self.scan_transition(token, VisitEvent::CheckIn).await
    }

    pub async fn check_out(&self, token: &str) -> Result<VisitDetail> {
        self.scan_transition(token, VisitEvent::CheckOut).await
    }

    /// Looks up the visit a token was issued for without changing it. The
    /// visit currently holding the token wins; otherwise the newest visit of
    /// that visitor on the embedded date.
    pub async fn scan(&self, token: &str) -> Result<VisitDetail> {
        let verified = self.verify_token(token, "scan")?;
        let query = format!(
            "{} WHERE v.user_id = $1 AND (v.qr_code = $3 OR v.visit_date = $2)
             ORDER BY (v.qr_code = $3) DESC, v.created_at DESC LIMIT 1",
            VISIT_DETAIL_SELECT
        );
        let row = sqlx::query_as::<_, VisitDetailRow>(&query)
            .bind(verified.visitor_id)
            .bind(verified.visit_date)
            .bind(token.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Visit not found".to_string()))?;
        Ok(row.into())
    }

    pub async fn cancel(&self, visit_id: Uuid, actor: AuthUser) -> Result<VisitDetail> {
        let query = format!("SELECT {} FROM visits WHERE id = $1", VISIT_COLUMNS);
        let visit = sqlx::query_as::<_, Visit>(&query)
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Visit not found".to_string()))?;
        if visit.user_id != actor.id && !actor.role.meets(Role::Admin) {
            return Err(Error::Forbidden(
                "Only the visitor or an admin can cancel this visit".to_string(),
            ));
        }
        self.apply(&visit, VisitEvent::Cancel).await?;
        self.get_detail(visit.id).await
    }

    /// Merges the supplied flags into every visit the user owns and returns
    /// the resulting preferences.
    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        patch: PreferencesPatch,
    ) -> Result<NotificationPreferences> {
        let patch = serde_json::to_value(patch)
            .map_err(|e| Error::Internal(format!("preferences encoding failed: {}", e)))?;
        let updated: Vec<Json<NotificationPreferences>> = sqlx::query_scalar(
            "UPDATE visits
             SET notification_preferences = notification_preferences || $2,
                 updated_at = NOW()
             WHERE user_id = $1
             RETURNING notification_preferences",
        )
        .bind(user_id)
        .bind(Json(patch))
        .fetch_all(&self.pool)
        .await?;

        updated
            .into_iter()
            .next()
            .map(|Json(prefs)| prefs)
            .ok_or_else(|| Error::NotFound("No visits found for this visitor".to_string()))
    }

    pub async fn counts(&self, now: DateTime<Utc>) -> Result<VisitCounts> {
        let counts = sqlx::query_as::<_, VisitCounts>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'scheduled') AS scheduled,
                    COUNT(*) FILTER (WHERE status = 'checked-in') AS checked_in,
                    COUNT(*) FILTER (WHERE status = 'checked-out') AS checked_out,
                    COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                    COUNT(*) FILTER (WHERE status = 'scheduled' AND visit_date > $1) AS upcoming,
                    COUNT(*) FILTER (WHERE qr_code IS NOT NULL AND qr_code_expiry > $1) AS valid_qr_codes,
                    COUNT(*) FILTER (WHERE qr_code IS NOT NULL AND qr_code_expiry <= $1) AS expired_qr_codes
             FROM visits",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn summary(&self, now: DateTime<Utc>) -> Result<VisitorSummary> {
        let counts = self.counts(now).await?;
        let total_visitors: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM visits")
            .fetch_one(&self.pool)
            .await?;
        Ok(VisitorSummary {
            total_visitors,
            active_visitors: counts.checked_in,
            scheduled_visitors: counts.scheduled,
            checked_out_visitors: counts.checked_out,
            cancelled_visitors: counts.cancelled,
            upcoming_visits: counts.upcoming,
            completed_visits: counts.checked_out,
            total_visits: counts.total,
            qr_code_stats: QrCodeStats {
                valid_qr_codes: counts.valid_qr_codes,
                expired_qr_codes: counts.expired_qr_codes,
            },
        })
    }

    async fn scan_transition(&self, token: &str, event: VisitEvent) -> Result<VisitDetail> {
        let token = token.trim();
        let verified = self.verify_token(token, event.as_str())?;

        let query = format!(
            "SELECT {} FROM visits WHERE user_id = $1 AND qr_code = $2",
            VISIT_COLUMNS
        );
        let visit = sqlx::query_as::<_, Visit>(&query)
            .bind(verified.visitor_id)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Visit not found".to_string()))?;

        self.apply(&visit, event).await?;
        self.get_detail(visit.id).await
    }

    fn verify_token(&self, token: &str, action: &str) -> Result<VerifiedToken> {
        self.codec.verify(token).map_err(|rejection| {
            tracing::warn!(reason = rejection.reason(), action, "QR token rejected");
            Error::BadRequest(rejection.to_string())
        })
    }

    /// Persists one lifecycle step. The update only matches while the row is
    /// still in the event's source state, so a concurrent transition makes
    /// this one fail instead of overwriting it.
    async fn apply(&self, visit: &Visit, event: VisitEvent) -> Result<()> {
        let next = visit
            .status
            .transition(event)
            .map_err(|e| Error::BadRequest(e.to_string()))?;

        let result = match event {
            VisitEvent::CheckIn => {
                let reissued = self.codec.issue(visit.user_id, visit.visit_date)?;
                sqlx::query(
                    "UPDATE visits
                     SET status = $3, check_in_time = NOW(), qr_code = $4,
                         qr_code_expiry = $5, updated_at = NOW()
                     WHERE id = $1 AND status = $2",
                )
                .bind(visit.id)
                .bind(event.source())
                .bind(next)
                .bind(reissued.token)
                .bind(reissued.expires_at)
                .execute(&self.pool)
                .await?
            }
            VisitEvent::CheckOut => {
                sqlx::query(
                    "UPDATE visits
                     SET status = $3, check_out_time = NOW(), updated_at = NOW()
                     WHERE id = $1 AND status = $2",
                )
                .bind(visit.id)
                .bind(event.source())
                .bind(next)
                .execute(&self.pool)
                .await?
            }
            VisitEvent::Cancel => {
                sqlx::query(
                    "UPDATE visits SET status = $3, updated_at = NOW()
                     WHERE id = $1 AND status = $2",
                )
                .bind(visit.id)
                .bind(event.source())
                .bind(next)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            tracing::warn!(visit_id = %visit.id, event = %event, "lost race on visit transition");
            return Err(Error::BadRequest(format!(
                "Visit is no longer {}",
                event.source()
            )));
        }
        tracing::info!(visit_id = %visit.id, from = %visit.status, to = %next, "visit transitioned");
        Ok(())
    }
}

fn group_visits(visits: Vec<Visit>, now: DateTime<Utc>) -> MyVisitsResponse {
    let mut grouped = MyVisitsResponse::default();
    for visit in visits {
        let entry = MyVisit {
            is_upcoming: visit.is_upcoming(now),
            is_active: visit.status == VisitStatus::CheckedIn,
            is_completed: visit.status == VisitStatus::CheckedOut,
            visit,
        };
        if entry.is_upcoming {
            grouped.upcoming_visits.push(entry);
        } else if entry.is_active {
            grouped.active_visits.push(entry);
        } else if entry.is_completed {
            grouped.completed_visits.push(entry);
        }
    }
    grouped
}
