use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::User;
use crate::utils::validation::not_blank;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    pub first_name: String,
    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(custom(function = "not_blank", message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(custom(function = "not_blank", message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    pub company: Option<String>,
    #[validate(url(message = "Photo must be a URL"))]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_email_and_names() {
        let payload: RegisterPayload = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "password": "abc",
            "firstName": "  ",
            "lastName": "Doe"
        }))
        .unwrap();
        let errs = payload.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("first_name"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn profile_update_skips_absent_fields() {
        assert!(UpdateProfilePayload::default().validate().is_ok());
        let blank = UpdateProfilePayload {
            first_name: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }
}
