//! Account routes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crate::handlers::AppState;
use crate::middleware::AuthUser;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User};
use crate::utils::errors::Result;

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.services.auth_service.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<AuthResponse>> {
    Ok(Json(state.services.auth_service.login(request).await?))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    Ok(Json(state.services.auth_service.me(user.id).await?))
}
