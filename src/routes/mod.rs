pub mod admin;
pub mod auth;
pub mod health;
pub mod super_admin;
pub mod visitors;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::expose_internal_errors;
use crate::middleware::auth::{require_auth, require_role};
use crate::models::user::Role;
use crate::AppState;

/// Builds the full HTTP surface. Each protected group declares the minimum
/// role it needs; `require_auth` always runs before `require_role`.
pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let visitor = Router::new()
        .route("/api/auth/me", get(auth::me).patch(auth::update_me))
        .route(
            "/api/visitors",
            post(visitors::create_visit).merge(
                get(visitors::list_visits)
                    .route_layer(from_fn_with_state(Role::Admin, require_role)),
            ),
        )
        .route("/api/visitors/my-visits", get(visitors::my_visits))
        .route("/api/visitors/preferences", patch(visitors::update_preferences))
        .route("/api/visitors/summary", get(visitors::summary))
        .route("/api/visitors/:id/cancel", post(visitors::cancel_visit));

    let admin = Router::new()
        .route("/api/visitors/check-in/:token", post(visitors::check_in))
        .route("/api/visitors/check-out/:token", post(visitors::check_out))
        .route("/api/visitors/scan", post(visitors::scan))
        .route("/api/admin/visitors", get(admin::list_visitors))
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/api/admin/settings", patch(admin::update_settings))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/summary", get(admin::summary))
        .route("/api/admin/dashboard-stats", get(admin::dashboard_stats))
        .route("/api/admin/schedule", get(admin::schedule))
        .route("/api/admin/visitor-stats", get(admin::visitor_stats))
        .route_layer(from_fn_with_state(Role::Admin, require_role));

    let super_admin = Router::new()
        .route("/api/super-admin/users", get(super_admin::list_users))
        .route("/api/super-admin/users/:user_id", delete(super_admin::delete_user))
        .route("/api/super-admin/promote/:user_id", post(super_admin::promote))
        .route("/api/super-admin/demote/:user_id", post(super_admin::demote))
        .route(
            "/api/super-admin/system-settings",
            patch(super_admin::update_system_settings),
        )
        .route_layer(from_fn_with_state(Role::SuperAdmin, require_role));

    let protected = visitor
        .merge(admin)
        .merge(super_admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(from_fn_with_state(state.config.app_env, expose_internal_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
