//! Session handlers backed by the identity provider.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rota_core::models::{AuthUser, UpdateAuthUser};
use rota_services::AuthSession;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CredentialsRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Format rules are not re-checked at sign-in.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v0/auth/signup",
    tag = "auth",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account and profile created", body = AuthSession),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CredentialsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .identity
        .sign_up(&request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    post,
    path = "/api/v0/auth/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthSession),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .identity
        .sign_in_with_password(&request.email, &request.password)
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/v0/auth/signout",
    tag = "auth",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    state.identity.sign_out(&auth.access_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v0/auth/user",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn current_user(auth: AuthContext) -> Json<AuthUser> {
    Json(auth.user)
}

#[utoipa::path(
    patch,
    path = "/api/v0/auth/user",
    tag = "auth",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = AuthUser),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .identity
        .update_user(
            &auth.access_token,
            UpdateAuthUser {
                email: request.email,
                password: request.password,
            },
        )
        .await?;
    Ok(Json(user))
}
