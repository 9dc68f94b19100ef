//! Join page handlers
//!
//! `GET /join` resolves the token, lets the session auto-accept when the
//! signed-in email matches, and returns the panel to render. `POST /join` is
//! the explicit "Join" button.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rota_core::AppError;
use rota_services::resolution::{
    ALREADY_ACCEPTED, MALFORMED_TOKEN, MISSING_TOKEN, NOT_FOUND_OR_EXPIRED,
};
use rota_services::{
    InvitationResolution, JoinAttempt, JoinPageView, JoinSession, ResolutionState,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::{AuthContext, OptionalViewer};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct JoinQuery {
    /// 64 lowercase hex characters
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinPageResponse {
    pub view: JoinPageView,
    /// Set when this request ran a join
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined: Option<bool>,
}

async fn resolve(state: &AppState, token: Option<String>) -> InvitationResolution {
    InvitationResolution::load(
        token,
        state.invitations.clone(),
        state.repositories.companies.clone(),
    )
    .await
}

async fn render(
    resolution: &InvitationResolution,
    session: &JoinSession,
    attempt: Option<JoinAttempt>,
) -> JoinPageResponse {
    let view = JoinPageView::derive(
        resolution.state(),
        &session.viewer().await,
        &session.snapshot().await,
        Utc::now(),
    );
    let joined = match attempt {
        Some(JoinAttempt::Joined(_)) => Some(true),
        Some(JoinAttempt::Failed(_)) => Some(false),
        Some(JoinAttempt::Skipped) | None => None,
    };
    JoinPageResponse { view, joined }
}

/// Map an unusable resolution onto an HTTP error for the explicit join.
fn resolution_error(state: &ResolutionState) -> AppError {
    match state {
        ResolutionState::Failed(message)
            if message == MISSING_TOKEN || message == MALFORMED_TOKEN =>
        {
            AppError::InvalidInput(message.clone())
        }
        ResolutionState::Failed(message) if message == ALREADY_ACCEPTED => {
            AppError::Conflict(message.clone())
        }
        ResolutionState::NotFound(message) => AppError::NotFound(message.clone()),
        ResolutionState::Failed(message) => AppError::Internal(message.clone()),
        ResolutionState::Loading | ResolutionState::Resolved(_) => {
            AppError::NotFound(NOT_FOUND_OR_EXPIRED.to_string())
        }
    }
}

#[utoipa::path(
    get,
    path = "/join",
    tag = "join",
    params(JoinQuery),
    responses(
        (status = 200, description = "Panel to render, after any auto-accept", body = JoinPageResponse)
    ),
    security((), ("bearer" = []))
)]
#[tracing::instrument(skip(state, viewer, query))]
pub async fn join_page(
    State(state): State<Arc<AppState>>,
    OptionalViewer(viewer): OptionalViewer,
    Query(query): Query<JoinQuery>,
) -> impl IntoResponse {
    let resolution = resolve(&state, query.token).await;
    let session = state
        .joiner
        .session(resolution.invitation().cloned(), viewer);
    let attempt = session.on_change(Utc::now()).await;

    Json(render(&resolution, &session, attempt).await)
}

#[utoipa::path(
    post,
    path = "/join",
    tag = "join",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Join attempted; failures are reported in the view", body = JoinPageResponse),
        (status = 400, description = "Missing or malformed token", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse),
        (status = 409, description = "Invitation already accepted", body = ErrorResponse),
        (status = 410, description = "Invitation expired", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user.id))]
pub async fn join_company(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<JoinRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let resolution = resolve(&state, Some(request.token)).await;
    let invitation = resolution
        .invitation()
        .cloned()
        .ok_or_else(|| resolution_error(resolution.state()))?;
    if resolution.is_expired(Utc::now()) {
        return Err(AppError::Expired("This invitation has expired".to_string()).into());
    }

    let session = state.joiner.session(Some(invitation), auth.viewer());
    let attempt = session.join_company().await;

    Ok(Json(render(&resolution, &session, Some(attempt)).await))
}
