use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Json,
};

use crate::{
    dto::admin_dto::{
        DashboardStats, DateRangeQuery, ScheduleQuery, SettingsPayload, StatusSummary,
        VisitorListQuery, VisitorListResponse, VisitorStats,
    },
    dto::common::ApiResponse,
    error::{Error, Result},
    middleware::auth::AuthUser,
    utils::{
        json::{ApiQuery, ValidatedJson},
        time,
    },
    AppState,
};

#[axum::debug_handler]
pub async fn list_visitors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VisitorListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.admin_service.list_visitors(query).await?;
    Ok(Json(ApiResponse::ok(VisitorListResponse {
        visitors: page.visitors,
        pagination: page.pagination,
    })))
}

#[axum::debug_handler]
pub async fn analytics(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<impl IntoResponse> {
    let analytics = state.admin_service.analytics(range).await?;
    Ok(Json(ApiResponse::ok(analytics)))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<SettingsPayload>,
) -> Result<impl IntoResponse> {
    let admin = state.admin_service.update_settings(auth.id, payload).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Settings updated successfully",
        admin,
    )))
}

#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let profile = state.admin_service.dashboard(auth.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[axum::debug_handler]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let counts = state.visit_service.counts(time::now()).await?;
    Ok(Json(ApiResponse::ok(StatusSummary {
        total_visitors: counts.total,
        active_visitors: counts.checked_in,
        scheduled_visitors: counts.scheduled,
        checked_out_visitors: counts.checked_out,
    })))
}

#[axum::debug_handler]
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let now = time::now();
    let today = state.admin_service.today_stats(now).await?;
    let this_week = state.admin_service.week_stats(now).await?;
    Ok(Json(ApiResponse::ok(DashboardStats { today, this_week })))
}

#[axum::debug_handler]
pub async fn schedule(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> Result<impl IntoResponse> {
    let (Some(start), Some(end)) = (query.start.as_deref(), query.end.as_deref()) else {
        return Err(Error::BadRequest(
            "Start and end dates are required".to_string(),
        ));
    };
    let invalid = || Error::BadRequest("Invalid date format".to_string());
    let start = time::parse_bound(start, false).ok_or_else(invalid)?;
    let end = time::parse_bound(end, true).ok_or_else(invalid)?;

    let visits = state.admin_service.schedule(start, end).await?;
    Ok(Json(ApiResponse::ok(visits)))
}

#[axum::debug_handler]
pub async fn visitor_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let today = state.admin_service.today_stats(time::now()).await?;
    Ok(Json(ApiResponse::ok(VisitorStats {
        today_total: today.total_visitors,
        checked_in: today.checked_in,
        pending: today.scheduled,
        completed: today.checked_out,
    })))
}
