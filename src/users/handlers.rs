use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::AppError,
    state::AppState,
    users::{
        cache::LookupKey,
        dto::{
            normalize_email, ChangePasswordRequest, CreateUserRequest, MessageResponse,
            UpdateUserRequest,
        },
        repo_types::{NewUser, User, UserChanges, UserField},
    },
};

/// Read-through lookup: consult the cache, fall back to the database and
/// populate the cache on a hit. Absent users are not cached.
async fn lookup_user(state: &AppState, key: LookupKey) -> Result<Arc<User>, AppError> {
    if let Some(user) = state.user_cache.get(&key).await {
        debug!(?key, "user cache hit");
        return Ok(user);
    }
    let found = match &key {
        LookupKey::Id(id) => User::find_by_id(&state.db, *id).await?,
        LookupKey::Field(field, value) => User::find_by_field(&state.db, *field, value).await?,
    };
    let user = Arc::new(found.ok_or_else(|| AppError::NotFound("User not found.".into()))?);
    state.user_cache.put(key, user.clone()).await;
    Ok(user)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;
    let new = NewUser {
        first_name: payload.first_name,
        last_name: payload.last_name,
        username: payload.username,
        email: payload.email.map(|e| normalize_email(&e)),
        phone_number: payload.phone_number,
        password_hash,
    };

    let user = match User::create(&state.db, &new).await {
        Ok(u) => u,
        Err(e) => {
            let err: AppError = e.into();
            if matches!(err, AppError::Conflict(_)) {
                warn!(username = %new.username, "duplicate unique field on register");
            }
            return Err(err);
        }
    };

    state.user_cache.invalidate();
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully.")),
    ))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    if let Some(users) = state.user_cache.get_all().await {
        debug!("user list cache hit");
        return Ok(Json((*users).clone()));
    }

    let users = User::all(&state.db).await?;
    if users.is_empty() {
        return Err(AppError::NotFound("No users found.".into()));
    }
    state.user_cache.put_all(Arc::new(users.clone())).await;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = lookup_user(&state, LookupKey::Id(id)).await?;
    Ok(Json((*user).clone()))
}

#[instrument(skip(state))]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = lookup_user(
        &state,
        LookupKey::Field(UserField::Email, normalize_email(&email)),
    )
    .await?;
    Ok(Json((*user).clone()))
}

#[instrument(skip(state))]
pub async fn get_user_by_phone(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = lookup_user(&state, LookupKey::Field(UserField::Phone, phone_number)).await?;
    Ok(Json((*user).clone()))
}

#[instrument(skip(state))]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = lookup_user(&state, LookupKey::Field(UserField::Username, username)).await?;
    Ok(Json((*user).clone()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    if payload.is_empty() {
        return Err(AppError::Validation("Update failed: no fields to update.".into()));
    }

    let changes = UserChanges {
        first_name: payload.first_name,
        last_name: payload.last_name,
        username: payload.username,
        email: payload.email.map(|e| normalize_email(&e)),
        phone_number: payload.phone_number,
        active_status: payload.active_status,
    };

    let user = User::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    state.user_cache.invalidate();
    info!(user_id = id, "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    let current_ok = verify_password(&payload.password, &user.password_hash)?;
    if !current_ok {
        warn!(user_id = id, "current password mismatch on change_password");
        return Err(AppError::Validation("Password validation failed.".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    let updated = User::update_password(&state.db, id, &new_hash).await?;
    if !updated {
        return Err(AppError::NotFound("User not found.".into()));
    }

    state.user_cache.invalidate();
    info!(user_id = id, "password changed");
    Ok(Json(MessageResponse::new("Password changed successfully.")))
}
