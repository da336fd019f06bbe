use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use crate::{
    dto::auth_dto::{AuthResponse, LoginPayload, RegisterPayload, UpdateProfilePayload},
    dto::common::ApiResponse,
    error::Result,
    middleware::auth::AuthUser,
    models::user::User,
    utils::json::ValidatedJson,
    AppState,
};

fn session(state: &AppState, user: User) -> Result<AuthResponse> {
    let token = state.jwt.issue(user.id, user.role)?;
    Ok(AuthResponse {
        token,
        expires_in: state.jwt.expiration_seconds(),
        user,
    })
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterPayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.register(payload).await?;
    let body = session(&state, user)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message("Registration successful", body)),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginPayload>,
) -> Result<impl IntoResponse> {
    let user = state
        .user_service
        .authenticate(&payload.email, &payload.password)
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "login");
    let body = session(&state, user)?;
    Ok(Json(ApiResponse::ok(body)))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get(auth.id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.update_profile(auth.id, payload).await?;
    Ok(Json(ApiResponse::ok_with_message("Profile updated", user)))
}
