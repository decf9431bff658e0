use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

pub mod cache;
pub mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/users", get(handlers::list_users))
        .route(
            "/user/:id",
            get(handlers::get_user_by_id).patch(handlers::update_user),
        )
        .route("/user/email/:email", get(handlers::get_user_by_email))
        .route("/user/phone/:phone_number", get(handlers::get_user_by_phone))
        .route(
            "/user/username/:username",
            get(handlers::get_user_by_username),
        )
        .route("/user/change_password/:id", patch(handlers::change_password))
}
