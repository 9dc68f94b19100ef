//! Invitation handlers addressed by invitation id, plus the caller's own
//! pending invitations.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rota_core::models::{Invitation, InvitationWithCompany};
use rota_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Invitation plus the link that was (or would be) emailed
#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub invitation_url: String,
}

impl InvitationResponse {
    pub fn new(state: &AppState, invitation: Invitation) -> Self {
        Self {
            invitation_url: state.invitations.invitation_url(&invitation.invitation_token),
            invitation,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMessageRequest {
    /// `null` or blank clears the message
    #[validate(length(max = 1000, message = "Message must be at most 1000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendInvitationRequest {
    #[validate(range(min = 1, max = 30, message = "days must be between 1 and 30"))]
    pub days: i64,
}

/// Load an invitation and check the caller manages its company.
async fn managed_invitation(
    state: &AppState,
    auth: &AuthContext,
    invitation_id: Uuid,
) -> Result<Invitation, HttpAppError> {
    let invitation = state
        .invitations
        .get_by_id(invitation_id)
        .await
        .map_err(|e| match e {
            rota_core::StoreError::NotFound(_) => {
                AppError::NotFound("Invitation not found".to_string())
            }
            other => other.into(),
        })?;
    state
        .companies
        .require_manager(invitation.company_id, auth.profile.id)
        .await?;
    Ok(invitation)
}

#[utoipa::path(
    get,
    path = "/api/v0/invitations/mine",
    tag = "invitations",
    responses(
        (status = 200, description = "Pending, unexpired invitations for the caller's email", body = Vec<InvitationWithCompany>),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn my_invitations(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let invitations = state.invitations.get_by_email(&auth.user.email).await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    patch,
    path = "/api/v0/invitations/{invitation_id}/message",
    tag = "invitations",
    params(("invitation_id" = Uuid, Path, description = "Invitation ID")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Updated invitation", body = InvitationResponse),
        (status = 403, description = "Not an owner or admin", body = ErrorResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(invitation_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateMessageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    managed_invitation(&state, &auth, invitation_id).await?;
    let invitation = state
        .invitations
        .update_message(invitation_id, request.message)
        .await?;
    Ok(Json(InvitationResponse::new(&state, invitation)))
}

#[utoipa::path(
    post,
    path = "/api/v0/invitations/{invitation_id}/extend",
    tag = "invitations",
    params(("invitation_id" = Uuid, Path, description = "Invitation ID")),
    request_body = ExtendInvitationRequest,
    responses(
        (status = 200, description = "Expiry moved to now + days; token unchanged", body = InvitationResponse),
        (status = 403, description = "Not an owner or admin", body = ErrorResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse),
        (status = 409, description = "Invitation is no longer pending", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state, auth, request))]
pub async fn extend_invitation(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(invitation_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ExtendInvitationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    managed_invitation(&state, &auth, invitation_id).await?;
    let invitation = state.invitations.extend(invitation_id, request.days).await?;
    Ok(Json(InvitationResponse::new(&state, invitation)))
}

#[utoipa::path(
    delete,
    path = "/api/v0/invitations/{invitation_id}",
    tag = "invitations",
    params(("invitation_id" = Uuid, Path, description = "Invitation ID")),
    responses(
        (status = 204, description = "Invitation deleted"),
        (status = 403, description = "Not an owner or admin", body = ErrorResponse),
        (status = 404, description = "Invitation not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state, auth))]
pub async fn cancel_invitation(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(invitation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    managed_invitation(&state, &auth, invitation_id).await?;
    if !state.invitations.cancel(invitation_id).await? {
        return Err(AppError::NotFound("Invitation not found".to_string()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
