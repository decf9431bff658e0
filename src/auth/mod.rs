use axum::{routing::post, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/login/email", post(handlers::login_email))
        .route("/login/otp", post(handlers::send_otp))
        .route("/login/phone", post(handlers::login_phone))
}
