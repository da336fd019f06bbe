use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::Error;
use crate::models::user::Role;
use crate::AppState;

/// The authenticated caller, placed in request extensions by `require_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(AUTHORIZATION) else {
        return unauthorized("Access denied. No token provided");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("Malformed authorization header");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("Unsupported authorization scheme");
    };

    let claims = match state.jwt.verify(token.trim()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            return unauthorized("Invalid or expired token");
        }
    };

    // The account may have been deleted, deactivated or re-ranked since the
    // token was issued; the stored role is authoritative.
    let role = match state.user_service.active_role(claims.sub).await {
        Ok(Some(role)) => role,
        Ok(None) => {
            tracing::debug!(user_id = %claims.sub, "session for missing or inactive user");
            return unauthorized("Account is no longer active");
        }
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role,
    });
    next.run(req).await
}

/// Must run inside `require_auth`. Rejects callers ranked below `minimum`.
pub async fn require_role(State(minimum): State<Role>, req: Request, next: Next) -> Response {
    let Some(user) = req.extensions().get::<AuthUser>().copied() else {
        return unauthorized("Authentication required");
    };
    if !user.role.meets(minimum) {
        tracing::debug!(user_id = %user.id, role = %user.role, required = %minimum, "insufficient role");
        return Error::Forbidden("Access denied. Insufficient permissions".to_string()).into_response();
    }
    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    Error::Unauthorized(message.to_string()).into_response()
}
