use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::dto::admin_dto::{
    AdminDashboard, AnalyticsResponse, DateRangeQuery, HourCount, PeriodStats, PurposeCount,
    SettingsPayload, StatusCount, VisitorListQuery,
};
use crate::dto::common::Pagination;
use crate::dto::super_admin_dto::PromotePayload;
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::user::{Role, User};
use crate::models::visit::{VisitDetail, VisitDetailRow};
use crate::services::user_service::USER_COLUMNS;
use crate::services::visit_service::VISIT_DETAIL_SELECT;
use crate::utils::time::{day_window, week_window};

const ADMIN_COLUMNS: &str = "id, user_id, department, title, timezone, notification_settings, system_settings, permissions, created_at, updated_at";

const RANGE_FILTER: &str = "($1::timestamptz IS NULL OR visit_date >= $1)
    AND ($2::timestamptz IS NULL OR visit_date <= $2)";

#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
}

pub struct VisitorPage {
    pub visitors: Vec<VisitDetail>,
    pub pagination: Pagination,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_visitors(&self, query: VisitorListQuery) -> Result<VisitorPage> {
        let page = query.page();
        let limit = query.limit();
        let offset = query.offset();

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            filters.push(format!("v.status = ${}::visit_status", args.len() + 1));
            args.push(status.as_str().to_string());
        }
        if let Some(start) = query.start_date {
            filters.push(format!("v.visit_date >= ${}::timestamptz", args.len() + 1));
            args.push(start.to_rfc3339());
        }
        if let Some(end) = query.end_date {
            filters.push(format!("v.visit_date <= ${}::timestamptz", args.len() + 1));
            args.push(end.to_rfc3339());
        }
        if let Some(pattern) = query.search_pattern() {
            let n = args.len() + 1;
            filters.push(format!(
                "(u.first_name ILIKE ${n} ESCAPE '\\' OR u.last_name ILIKE ${n} ESCAPE '\\' \
                 OR v.purpose ILIKE ${n} ESCAPE '\\')"
            ));
            args.push(pattern);
        }

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "{} {} ORDER BY v.visit_date DESC LIMIT ${} OFFSET ${}",
            VISIT_DETAIL_SELECT,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!(
            "SELECT COUNT(*) FROM visits v JOIN users u ON u.id = v.user_id {}",
            where_clause
        );

        let mut items_statement = sqlx::query_as::<_, VisitDetailRow>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let rows = items_statement
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(VisitorPage {
            visitors: rows.into_iter().map(VisitDetail::from).collect(),
            pagination: Pagination::new(total, page, limit),
        })
    }

    pub async fn analytics(&self, range: DateRangeQuery) -> Result<AnalyticsResponse> {
        let (start, end) = (range.start_date, range.end_date);

        let total_visitors: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM visits WHERE {}", RANGE_FILTER))
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;

        let top_purposes = sqlx::query_as::<_, PurposeCount>(&format!(
            "SELECT purpose, COUNT(*) AS count FROM visits WHERE {}
             GROUP BY purpose ORDER BY count DESC, purpose ASC LIMIT 5",
            RANGE_FILTER
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let average_daily_visitors: f64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(AVG(per_day), 0)::float8 FROM (
                SELECT COUNT(*) AS per_day FROM visits WHERE {}
                GROUP BY (visit_date AT TIME ZONE 'UTC')::date
             ) daily",
            RANGE_FILTER
        ))
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let visits_by_hour = sqlx::query_as::<_, HourCount>(&format!(
            "SELECT EXTRACT(HOUR FROM visit_date AT TIME ZONE 'UTC')::int4 AS hour, COUNT(*) AS count
             FROM visits WHERE {}
             GROUP BY 1 ORDER BY 1",
            RANGE_FILTER
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let status_breakdown = sqlx::query_as::<_, StatusCount>(&format!(
            "SELECT status, COUNT(*) AS count FROM visits WHERE {}
             GROUP BY status ORDER BY status",
            RANGE_FILTER
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnalyticsResponse {
            total_visitors,
            top_purposes,
            average_daily_visitors,
            visits_by_hour,
            status_breakdown,
        })
    }

    pub async fn update_settings(&self, user_id: Uuid, payload: SettingsPayload) -> Result<Admin> {
        let query = format!(
            "UPDATE admins
             SET notification_settings = notification_settings || $2,
                 system_settings = system_settings || $3,
                 updated_at = NOW()
             WHERE user_id = $1
             RETURNING {}",
            ADMIN_COLUMNS
        );
        sqlx::query_as::<_, Admin>(&query)
            .bind(user_id)
            .bind(Json(payload.notification_json()))
            .bind(Json(payload.system_json()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Admin record not found".to_string()))
    }

    /// Applies the same partial settings to every admin record.
    pub async fn update_all_settings(&self, payload: SettingsPayload) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE admins
             SET notification_settings = notification_settings || $1,
                 system_settings = system_settings || $2,
                 updated_at = NOW()",
        )
        .bind(Json(payload.notification_json()))
        .bind(Json(payload.system_json()))
        .execute(&self.pool)
        .await?;
        tracing::info!(admins = result.rows_affected(), "system settings applied");
        Ok(result.rows_affected())
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<AdminDashboard> {
        sqlx::query_as::<_, AdminDashboard>(
            "SELECT u.id, u.email, u.first_name, u.last_name, u.role, u.phone, u.photo,
                    a.department, a.title, a.timezone
             FROM users u
             JOIN admins a ON a.user_id = u.id
             WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Admin record not found".to_string()))
    }

    pub async fn period_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PeriodStats> {
        let stats = sqlx::query_as::<_, PeriodStats>(
            "SELECT COUNT(*) AS total_visitors,
                    COUNT(*) FILTER (WHERE status = 'checked-in') AS checked_in,
                    COUNT(*) FILTER (WHERE status = 'checked-out') AS checked_out,
                    COUNT(*) FILTER (WHERE status = 'scheduled') AS scheduled
             FROM visits
             WHERE visit_date >= $1 AND visit_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn today_stats(&self, now: DateTime<Utc>) -> Result<PeriodStats> {
        let (start, end) = day_window(now);
        self.period_stats(start, end).await
    }

    pub async fn week_stats(&self, now: DateTime<Utc>) -> Result<PeriodStats> {
        let (start, end) = week_window(now);
        self.period_stats(start, end).await
    }

    /// Visits in the half-open window `[start, end)`.
    pub async fn schedule(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<VisitDetail>> {
        if start >= end {
            return Err(Error::BadRequest(
                "Start date must not be after end date".to_string(),
            ));
        }
        let query = format!(
            "{} WHERE v.visit_date >= $1 AND v.visit_date < $2 ORDER BY v.visit_date ASC",
            VISIT_DETAIL_SELECT
        );
        let rows = sqlx::query_as::<_, VisitDetailRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(VisitDetail::from).collect())
    }

    /// Grants the admin role and creates (or refreshes) the admin record in
    /// one transaction.
    pub async fn promote(&self, user_id: Uuid, payload: PromotePayload) -> Result<(User, Admin)> {
        let mut tx = self.pool.begin().await?;

        let user = lock_user(&mut tx, user_id).await?;
        guard_role_change(&user)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(Role::Admin)
        .fetch_one(&mut *tx)
        .await?;

        let admin = sqlx::query_as::<_, Admin>(&format!(
            "INSERT INTO admins (user_id, department, title)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET department = EXCLUDED.department,
                 title = EXCLUDED.title,
                 updated_at = NOW()
             RETURNING {}",
            ADMIN_COLUMNS
        ))
        .bind(user_id)
        .bind(payload.department.trim())
        .bind(payload.title.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, "user promoted to admin");
        Ok((user, admin))
    }

    /// Reverts an admin to a visitor and drops the admin record in one
    /// transaction.
    pub async fn demote(&self, user_id: Uuid) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let user = lock_user(&mut tx, user_id).await?;
        guard_role_change(&user)?;
        if user.role != Role::Admin {
            return Err(Error::BadRequest("User is not an admin".to_string()));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(Role::Visitor)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM admins WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, "admin demoted to visitor");
        Ok(user)
    }
}

async fn lock_user(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, user_id: Uuid) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

fn guard_role_change(user: &User) -> Result<()> {
    if user.role.meets(Role::SuperAdmin) {
        return Err(Error::BadRequest(format!(
            "Cannot change the role of a {} account",
            user.role
        )));
    }
    Ok(())
}
