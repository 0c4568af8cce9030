//! Registration and login handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::users::{LoginCommand, RegisterCommand};

use super::{json_body, sanitize, user_to_api};
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{LoginRequest, RegisterRequest, UserResponse};
use crate::infra::http::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;

    let authenticated = state
        .users
        .register(RegisterCommand {
            name: sanitize(&payload.name),
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(user_to_api)?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(authenticated))))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;

    let authenticated = state
        .users
        .login(LoginCommand {
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(user_to_api)?;

    Ok(Json(UserResponse::from(authenticated)))
}
