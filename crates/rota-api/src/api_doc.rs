//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use rota_core::models;
use rota_services::{events, identity, join, join_page, resolution};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rota API",
        version = "0.1.0",
        description = "Company invitations and joining for Rota workforce scheduling. JSON endpoints are versioned under /api/v0/; the join page lives at /join."
    ),
    paths(
        handlers::health::health_check,
        handlers::join::join_page,
        handlers::join::join_company,
        handlers::auth::sign_up,
        handlers::auth::sign_in,
        handlers::auth::sign_out,
        handlers::auth::current_user,
        handlers::auth::update_user,
        handlers::companies::create_company,
        handlers::companies::get_company,
        handlers::companies::list_members,
        handlers::companies::create_invitation,
        handlers::companies::list_invitations,
        handlers::invitations::my_invitations,
        handlers::invitations::update_message,
        handlers::invitations::extend_invitation,
        handlers::invitations::cancel_invitation,
        handlers::events::invitation_events,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthResponse,
        handlers::join::JoinRequest,
        handlers::join::JoinPageResponse,
        handlers::auth::CredentialsRequest,
        handlers::auth::SignInRequest,
        handlers::auth::UpdateUserRequest,
        handlers::companies::CreateCompanyRequest,
        handlers::companies::CreateCompanyResponse,
        handlers::companies::CreateInvitationRequest,
        handlers::invitations::InvitationResponse,
        handlers::invitations::UpdateMessageRequest,
        handlers::invitations::ExtendInvitationRequest,
        models::AuthUser,
        models::Company,
        models::CompanyMembership,
        models::MembershipRole,
        models::Invitation,
        models::InvitationRole,
        models::InvitationStatus,
        models::InvitationWithCompany,
        identity::AuthSession,
        join::JoinOutcome,
        join_page::JoinPageView,
        join_page::InvitationSummary,
        resolution::ResolvedInvitation,
        events::InvitationEvent,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service health"),
        (name = "join", description = "Invitation landing page and joining"),
        (name = "auth", description = "Sign up, sign in, and session management"),
        (name = "companies", description = "Companies and their members"),
        (name = "invitations", description = "Creating and managing invitations"),
        (name = "events", description = "Live invitation events"),
    )
)]
pub struct ApiDoc;
