use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    auth::{
        dto::{EmailLoginRequest, LoginRequest, SendOtpRequest, VerifyOtpRequest},
        services::{authenticate, LoginFlow, LoginOutcome},
    },
    error::AppError,
    state::AppState,
    users::dto::normalize_email,
};

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<LoginOutcome, AppError> {
    authenticate(
        &state,
        LoginFlow::Username {
            username: payload.username,
            password: payload.password,
        },
    )
    .await
}

#[instrument(skip(state, payload))]
pub async fn login_email(
    State(state): State<AppState>,
    Json(mut payload): Json<EmailLoginRequest>,
) -> Result<LoginOutcome, AppError> {
    // Same canonical form as registration, so a mixed-case signup can
    // still log in.
    payload.email = normalize_email(&payload.email);
    authenticate(
        &state,
        LoginFlow::Email {
            email: payload.email,
            password: payload.password,
        },
    )
    .await
}

#[instrument(skip(state, payload))]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<LoginOutcome, AppError> {
    authenticate(
        &state,
        LoginFlow::OtpSend {
            phone_number: payload.phone_number,
        },
    )
    .await
}

#[instrument(skip(state, payload))]
pub async fn login_phone(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<LoginOutcome, AppError> {
    authenticate(
        &state,
        LoginFlow::OtpVerify {
            phone_number: payload.phone_number,
            otp: payload.otp,
        },
    )
    .await
}
