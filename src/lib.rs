pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    admin_service::AdminService, user_service::UserService, visit_service::VisitService,
};
use crate::utils::{jwt::JwtKeys, qr_code::QrCodec};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: JwtKeys,
    pub user_service: UserService,
    pub visit_service: VisitService,
    pub admin_service: AdminService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self> {
        let qr = QrCodec::new(&config.qr_secret, config.qr_ttl_hours)?;
        let jwt = JwtKeys::new(&config.jwt_secret, config.jwt_expiration_hours);

        let user_service = UserService::new(pool.clone());
        let visit_service = VisitService::new(pool.clone(), qr);
        let admin_service = AdminService::new(pool.clone());

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
            user_service,
            visit_service,
            admin_service,
        })
    }
}
