use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Canonical form for stored and looked-up emails. Registration, login and
/// the email lookup route must all go through this, otherwise a user who
/// registers with a mixed-case address can never match it again.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const MIN_NAME_LEN: usize = 4;
const MIN_PHONE_LEN: usize = 11;

fn require_min(field: &str, value: &str, min: usize) -> Result<(), AppError> {
    if value.trim().chars().count() < min {
        return Err(AppError::Validation(format!(
            "{field} must be at least {min} characters."
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email.trim()) {
        return Err(AppError::Validation("Invalid email format.".into()));
    }
    Ok(())
}

/// Request body for POST /register.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_min("first_name", &self.first_name, MIN_NAME_LEN)?;
        require_min("last_name", &self.last_name, MIN_NAME_LEN)?;
        require_min("username", &self.username, MIN_NAME_LEN)?;
        require_min("password", &self.password, MIN_NAME_LEN)?;
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            require_min("phone_number", phone, MIN_PHONE_LEN)?;
        }
        Ok(())
    }
}

/// Request body for PATCH /user/:id. There is no password field here: a
/// password key in the JSON body is dropped during deserialization, so
/// generic updates can never touch the stored hash.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub active_status: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(v) = &self.first_name {
            require_min("first_name", v, MIN_NAME_LEN)?;
        }
        if let Some(v) = &self.last_name {
            require_min("last_name", v, MIN_NAME_LEN)?;
        }
        if let Some(v) = &self.username {
            require_min("username", v, MIN_NAME_LEN)?;
        }
        if let Some(v) = &self.email {
            check_email(v)?;
        }
        if let Some(v) = &self.phone_number {
            require_min("phone_number", v, MIN_PHONE_LEN)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.active_status.is_none()
    }
}

/// Request body for PATCH /user/change_password/:id. `password` is the
/// current password, verified before the new one is stored.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.password.trim().is_empty() {
            return Err(AppError::Validation("password is required.".into()));
        }
        require_min("new_password", &self.new_password, MIN_NAME_LEN)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Alice".into(),
            last_name: "Anderson".into(),
            username: "alice01".into(),
            password: "Secret123".into(),
            email: Some("a@x.com".into()),
            phone_number: Some("15551234567".into()),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn rejects_short_username() {
        let mut req = valid_create();
        req.username = "al".into();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_short_phone() {
        let mut req = valid_create();
        req.phone_number = Some("555123".into());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_bad_email() {
        let mut req = valid_create();
        req.email = Some("not-an-email".into());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut req = valid_create();
        req.email = None;
        req.phone_number = None;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn email_normalization_is_case_and_whitespace_insensitive() {
        assert_eq!(normalize_email(" Alice@X.com "), "alice@x.com");
        // Whatever form the email arrives in, registration and login derive
        // the same key.
        assert_eq!(
            normalize_email("Alice@x.com"),
            normalize_email(" alice@X.COM ")
        );
    }

    #[test]
    fn update_drops_password_key() {
        let body = r#"{"first_name":"Alicia","password":"sneaky-new-password"}"#;
        let req: UpdateUserRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.first_name.as_deref(), Some("Alicia"));
        assert!(!req.is_empty());
        // No field of the DTO can carry the password; it is simply gone.
    }

    #[test]
    fn change_password_requires_current() {
        let req = ChangePasswordRequest {
            password: "  ".into(),
            new_password: "NewSecret1".into(),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
