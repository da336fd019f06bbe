use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    dto::admin_dto::SettingsPayload,
    dto::common::ApiResponse,
    dto::super_admin_dto::{PromotePayload, PromoteResponse, RoleChange, SystemSettingsResult},
    error::Result,
    utils::json::{ApiPath, ValidatedJson},
    AppState,
};

#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = state.user_service.list().await?;
    Ok(Json(ApiResponse::ok(users)))
}

#[axum::debug_handler]
pub async fn promote(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<PromotePayload>,
) -> Result<impl IntoResponse> {
    let (user, admin) = state.admin_service.promote(user_id, payload).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "User promoted to admin",
        PromoteResponse {
            user: RoleChange::from(&user),
            admin,
        },
    )))
}

#[axum::debug_handler]
pub async fn demote(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.admin_service.demote(user_id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Admin demoted to visitor",
        RoleChange::from(&user),
    )))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.delete(user_id).await?;
    Ok(Json(ApiResponse::message("User deleted")))
}

#[axum::debug_handler]
pub async fn update_system_settings(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SettingsPayload>,
) -> Result<impl IntoResponse> {
    let updated_admins = state.admin_service.update_all_settings(payload).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "System settings updated",
        SystemSettingsResult { updated_admins },
    )))
}
