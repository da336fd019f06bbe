use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    dto::common::ApiResponse,
    dto::visitor_dto::{CreateVisitPayload, ScanPayload, UpdatePreferencesPayload},
    error::Result,
    middleware::auth::AuthUser,
    utils::{
        json::{ApiPath, ValidatedJson},
        time,
    },
    AppState,
};

#[axum::debug_handler]
pub async fn create_visit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<CreateVisitPayload>,
) -> Result<impl IntoResponse> {
    let visit = state.visit_service.create(auth.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message("Visit registered successfully", visit)),
    ))
}

#[axum::debug_handler]
pub async fn list_visits(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let visits = state.visit_service.list_all().await?;
    Ok(Json(ApiResponse::ok(visits)))
}

#[axum::debug_handler]
pub async fn my_visits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let visits = state.visit_service.my_visits(auth.id, time::now()).await?;
    Ok(Json(ApiResponse::ok(visits)))
}

#[axum::debug_handler]
pub async fn check_in(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let visit = state.visit_service.check_in(&token).await?;
    Ok(Json(ApiResponse::ok_with_message("Check-in successful", visit)))
}

#[axum::debug_handler]
pub async fn check_out(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let visit = state.visit_service.check_out(&token).await?;
    Ok(Json(ApiResponse::ok_with_message("Check-out successful", visit)))
}

#[axum::debug_handler]
pub async fn scan(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ScanPayload>,
) -> Result<impl IntoResponse> {
    let visit = state.visit_service.scan(&payload.qr_code).await?;
    Ok(Json(ApiResponse::ok(visit)))
}

#[axum::debug_handler]
pub async fn cancel_visit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    let visit = state.visit_service.cancel(id, auth).await?;
    Ok(Json(ApiResponse::ok_with_message("Visit cancelled", visit)))
}

#[axum::debug_handler]
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<UpdatePreferencesPayload>,
) -> Result<impl IntoResponse> {
    let prefs = state
        .visit_service
        .update_preferences(auth.id, payload.notification_preferences)
        .await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Notification preferences updated",
        prefs,
    )))
}

#[axum::debug_handler]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let summary = state.visit_service.summary(time::now()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
