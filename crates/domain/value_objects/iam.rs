use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::users::UserEntity;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 6, max = 100, message = "password must be 6 to 100 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub confirm_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email is not a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub expiration: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentUserDto {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<UserEntity> for CurrentUserDto {
    fn from(entity: UserEntity) -> Self {
        Self {
            user_id: entity.id,
            email: entity.email,
            first_name: entity.first_name,
            last_name: entity.last_name,
        }
    }
}

/// Emails are stored and compared lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: "shopper@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn register_validation() {
        assert!(register("secret1", "secret1").validate().is_ok());
        assert!(register("secret1", "secret2").validate().is_err());
        assert!(register("short", "short").validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..register("secret1", "secret1")
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Shopper@Example.COM "), "shopper@example.com");
    }
}
