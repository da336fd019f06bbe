use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::admin::Admin;
use crate::models::user::{Role, User};
use crate::utils::validation::not_blank;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromotePayload {
    #[validate(custom(function = "not_blank", message = "Department is required"))]
    pub department: String,
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for RoleChange {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteResponse {
    pub user: RoleChange,
    pub admin: Admin,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettingsResult {
    pub updated_admins: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_requires_department_and_title() {
        let payload = PromotePayload {
            department: "Security".into(),
            title: " ".into(),
        };
        let errs = payload.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("title"));
        assert!(!errs.field_errors().contains_key("department"));
    }
}
