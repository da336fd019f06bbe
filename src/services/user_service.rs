use sqlx::PgPool;
use uuid::Uuid;

use crate::config::BootstrapAccount;
use crate::dto::auth_dto::{RegisterPayload, UpdateProfilePayload};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::utils::crypto::{hash_password, verify_password};

pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, phone, company, photo, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let email = normalize_email(&payload.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(Error::BadRequest("Email is already registered".to_string()));
        }
        let password_hash = hash_password(&payload.password)?;

        let query = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, role, phone, company)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&email)
            .bind(password_hash)
            .bind(payload.first_name.trim())
            .bind(payload.last_name.trim())
            .bind(Role::Visitor)
            .bind(payload.phone)
            .bind(payload.company)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_email)?;

        tracing::info!(user_id = %user.id, "registered visitor account");
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let invalid = || Error::Unauthorized("Invalid email or password".to_string());
        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(Error::Unauthorized("Account is deactivated".to_string()));
        }
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// Current role of an active account, or `None` once the account has
    /// been deleted or deactivated.
    pub async fn active_role(&self, id: Uuid) -> Result<Option<Role>> {
        let row: Option<(Role, bool)> =
            sqlx::query_as("SELECT role, is_active FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(role, is_active)| is_active.then_some(role)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_profile(&self, id: Uuid, payload: UpdateProfilePayload) -> Result<User> {
        let query = format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 phone = COALESCE($4, phone),
                 company = COALESCE($5, company),
                 photo = COALESCE($6, photo),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(payload.first_name.as_deref().map(str::trim))
            .bind(payload.last_name.as_deref().map(str::trim))
            .bind(payload.phone)
            .bind(payload.company)
            .bind(payload.photo)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Removes an account together with its admin record and visits.
    /// Super-admin and developer accounts cannot be deleted.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let user = self.get(id).await?;
        if user.role.meets(Role::SuperAdmin) {
            return Err(Error::BadRequest(format!(
                "Cannot delete a {} account",
                user.role
            )));
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(user_id = %id, "deleted user");
        Ok(())
    }

    /// Creates the configured super-admin on first start. An existing
    /// account with that email is left untouched.
    pub async fn ensure_super_admin(&self, account: &BootstrapAccount) -> Result<()> {
        let email = normalize_email(&account.email);
        if let Some(existing) = self.find_by_email(&email).await? {
            if !existing.role.meets(Role::SuperAdmin) {
                tracing::warn!(email = %email, role = %existing.role, "bootstrap account exists with a lower role");
            }
            return Ok(());
        }
        let password_hash = hash_password(&account.password)?;
        sqlx::query(
            "INSERT INTO users (email, password_hash, first_name, last_name, role)
             VALUES ($1, $2, 'Super', 'Admin', $3)",
        )
        .bind(&email)
        .bind(password_hash)
        .bind(Role::SuperAdmin)
        .execute(&self.pool)
        .await?;
        tracing::info!(email = %email, "created super-admin account");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unique_email(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::BadRequest("Email is already registered".to_string())
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn non_unique_errors_pass_through() {
        assert!(matches!(unique_email(sqlx::Error::RowNotFound), Error::NotFound(_)));
        assert!(matches!(
            unique_email(sqlx::Error::PoolTimedOut),
            Error::Database(_)
        ));
    }
}
