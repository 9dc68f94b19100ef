//! Company and company-scoped invitation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rota_core::models::{Company, CompanyMembership, Invitation, InvitationRole};
use rota_services::CreateInvitation;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::invitations::InvitationResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCompanyResponse {
    pub company: Company,
    pub membership: CompanyMembership,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub role: Option<InvitationRole>,
    #[validate(length(max = 1000, message = "Message must be at most 1000 characters"))]
    pub message: Option<String>,
    /// Defaults to the server's configured expiry
    #[validate(range(min = 1, max = 30, message = "expires_in_days must be between 1 and 30"))]
    pub expires_in_days: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/v0/companies",
    tag = "companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created; caller is owner", body = CreateCompanyResponse),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state, auth, request), fields(profile_id = %auth.profile.id))]
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateCompanyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (company, membership) = state
        .companies
        .create_company(&request.name, &auth.profile)
        .await?;
    tracing::info!(company_id = %company.id, "Company created");
    Ok((
        StatusCode::CREATED,
        Json(CreateCompanyResponse {
            company,
            membership,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v0/companies/{company_id}",
    tag = "companies",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 403, description = "Not a member, or no such company", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Membership first: outsiders get 403 whether or not the company exists.
    state
        .companies
        .require_member(company_id, auth.profile.id)
        .await?;
    let company = state.companies.get_company(company_id).await?;
    Ok(Json(company))
}

#[utoipa::path(
    get,
    path = "/api/v0/companies/{company_id}/members",
    tag = "companies",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Memberships, oldest first", body = Vec<CompanyMembership>),
        (status = 403, description = "Not an owner or admin", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .companies
        .require_manager(company_id, auth.profile.id)
        .await?;
    Ok(Json(state.companies.list_members(company_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v0/companies/{company_id}/invitations",
    tag = "invitations",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created; email sent in the background", body = InvitationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Not an owner or admin, or no such company", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state, auth, request), fields(profile_id = %auth.profile.id))]
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateInvitationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .companies
        .require_manager(company_id, auth.profile.id)
        .await?;
    let company = state.companies.get_company(company_id).await?;

    let invitation = state
        .invitations
        .create(CreateInvitation {
            company_id,
            invited_email: request.email,
            role: request.role.unwrap_or(InvitationRole::Member),
            message: request.message,
            expires_in_days: request.expires_in_days,
            company_name: Some(company.name),
            inviter_name: Some(auth.profile.display_name()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse::new(&state, invitation)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v0/companies/{company_id}/invitations",
    tag = "invitations",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "All invitations, newest first", body = Vec<InvitationResponse>),
        (status = 403, description = "Not an owner or admin", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .companies
        .require_manager(company_id, auth.profile.id)
        .await?;
    let invitations: Vec<Invitation> = state.invitations.get_by_company(company_id).await?;
    let response: Vec<InvitationResponse> = invitations
        .into_iter()
        .map(|invitation| InvitationResponse::new(&state, invitation))
        .collect();
    Ok(Json(response))
}
