use axum::extract::FromRef;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use crate::auth::dto::TokenResponse;
use crate::auth::jwt::TokenIssuer;
use crate::auth::otp::OtpManager;
use crate::auth::password::verify_password;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::dto::MessageResponse;
use crate::users::repo_types::{User, UserField};

/// One login attempt, keyed by request shape. Dispatch is a plain match on
/// this tagged union.
#[derive(Debug)]
pub enum LoginFlow {
    Username { username: String, password: String },
    Email { email: String, password: String },
    OtpSend { phone_number: String },
    OtpVerify { phone_number: String, otp: String },
}

#[derive(Debug)]
pub enum LoginOutcome {
    Token(TokenResponse),
    OtpSent,
}

impl IntoResponse for LoginOutcome {
    fn into_response(self) -> Response {
        match self {
            LoginOutcome::Token(token) => Json(token).into_response(),
            LoginOutcome::OtpSent => {
                Json(MessageResponse::new("OTP is sent successfully.")).into_response()
            }
        }
    }
}

fn require_present(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} is required.")));
    }
    Ok(())
}

impl LoginFlow {
    fn validate(&self) -> Result<(), AppError> {
        match self {
            LoginFlow::Username { username, password } => {
                require_present("username", username)?;
                require_present("password", password)
            }
            LoginFlow::Email { email, password } => {
                require_present("email", email)?;
                require_present("password", password)
            }
            LoginFlow::OtpSend { phone_number } => require_present("phone_number", phone_number),
            LoginFlow::OtpVerify { phone_number, otp } => {
                require_present("phone_number", phone_number)?;
                require_present("otp", otp)
            }
        }
    }
}

/// Run one authentication attempt. Domain failures (invalid credentials,
/// invalid OTP, rate limit) come back with their specific error; anything
/// unexpected surfaces as a generic internal error at the boundary.
pub async fn authenticate(state: &AppState, flow: LoginFlow) -> Result<LoginOutcome, AppError> {
    flow.validate()?;
    match flow {
        LoginFlow::Username { username, password } => {
            credential_login(state, UserField::Username, &username, &password).await
        }
        LoginFlow::Email { email, password } => {
            credential_login(state, UserField::Email, &email, &password).await
        }
        LoginFlow::OtpSend { phone_number } => send_otp(state, &phone_number).await,
        LoginFlow::OtpVerify { phone_number, otp } => {
            verify_otp_login(state, &phone_number, &otp).await
        }
    }
}

/// Shared path for username and email logins. An unknown identifier and a
/// wrong password produce the same error so responses carry no enumeration
/// signal.
async fn credential_login(
    state: &AppState,
    field: UserField,
    value: &str,
    password: &str,
) -> Result<LoginOutcome, AppError> {
    let user = match User::find_by_field(&state.db, field, value).await? {
        Some(user) => user,
        None => {
            warn!(field = field.column(), "login for unknown identifier");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = TokenIssuer::from_ref(state).issue(user.id)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(LoginOutcome::Token(token))
}

async fn send_otp(state: &AppState, phone_number: &str) -> Result<LoginOutcome, AppError> {
    let code = OtpManager::from_ref(state).send(phone_number).await?;
    state
        .messenger
        .send_message(phone_number, &format!("Your OTP is {code}"))
        .await?;
    info!(%phone_number, "otp sent");
    Ok(LoginOutcome::OtpSent)
}

async fn verify_otp_login(
    state: &AppState,
    phone_number: &str,
    otp: &str,
) -> Result<LoginOutcome, AppError> {
    let manager = OtpManager::from_ref(state);
    manager.verify(phone_number, otp).await?;

    let user = match User::find_by_field(&state.db, UserField::Phone, phone_number).await? {
        Some(user) => user,
        None => {
            warn!(%phone_number, "otp verified but no user for phone number");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = TokenIssuer::from_ref(state).issue(user.id)?;
    manager.invalidate(phone_number).await?;
    info!(user_id = user.id, "user logged in via otp");
    Ok(LoginOutcome::Token(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_username_is_rejected_before_any_lookup() {
        let state = AppState::fake();
        let err = authenticate(
            &state,
            LoginFlow::Username {
                username: "  ".into(),
                password: "Secret123".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn otp_send_acknowledges_without_returning_code() {
        let state = AppState::fake();
        let outcome = authenticate(
            &state,
            LoginFlow::OtpSend {
                phone_number: "15551234567".into(),
            },
        )
        .await
        .expect("send flow");
        assert!(matches!(outcome, LoginOutcome::OtpSent));
        // The code lives in the secret store, not in the response.
        let stored = state.secrets.get("15551234567").await.unwrap();
        assert_eq!(stored.expect("stored code").len(), 6);
    }

    #[tokio::test]
    async fn second_otp_send_for_same_number_is_rate_limited() {
        let state = AppState::fake();
        let flow = || LoginFlow::OtpSend {
            phone_number: "15551234567".into(),
        };
        authenticate(&state, flow()).await.expect("first send");
        let err = authenticate(&state, flow()).await.unwrap_err();
        assert!(matches!(err, AppError::OtpRateLimited(_)));
    }

    #[tokio::test]
    async fn otp_verify_with_no_outstanding_code_is_unauthorized() {
        let state = AppState::fake();
        let err = authenticate(
            &state,
            LoginFlow::OtpVerify {
                phone_number: "15551234567".into(),
                otp: "123456".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }
}
