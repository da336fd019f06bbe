use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_development(self) -> bool {
        self == AppEnv::Development
    }
}

impl std::str::FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub qr_secret: String,
    pub qr_ttl_hours: i64,
    pub app_env: AppEnv,
    pub super_admin: Option<BootstrapAccount>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let super_admin = match (
            env::var("SUPER_ADMIN_EMAIL").ok(),
            env::var("SUPER_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAccount { email, password }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "SUPER_ADMIN_EMAIL and SUPER_ADMIN_PASSWORD must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_expiration_hours: get_env_or("JWT_EXPIRATION_HOURS", 24)?,
            qr_secret: get_env("QR_SECRET")?,
            qr_ttl_hours: get_env_or("QR_TTL_HOURS", 24)?,
            app_env: get_env_or("APP_ENV", AppEnv::Development)?,
            super_admin,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_parses_common_spellings() {
        assert_eq!("production".parse::<AppEnv>().unwrap(), AppEnv::Production);
        assert_eq!("Dev".parse::<AppEnv>().unwrap(), AppEnv::Development);
        assert!("staging".parse::<AppEnv>().is_err());
    }
}
