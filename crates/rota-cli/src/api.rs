//! Domain methods for the Rota API client.
//!
//! Model types come from `rota_core::models`; response envelopes that only
//! exist at the HTTP layer are defined here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rota_core::models::{
    AuthUser, Company, CompanyMembership, Invitation, InvitationRole, InvitationWithCompany,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{api_prefix, ApiClient};

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCompanyResponse {
    pub company: Company,
    pub membership: CompanyMembership,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationResponse {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub invitation_url: String,
}

/// Join page panel. `view` is kept as raw JSON; its `view` tag names the panel.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub view: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<bool>,
}

impl JoinResponse {
    pub fn panel(&self) -> &str {
        self.view
            .get("view")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

impl ApiClient {
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.post_json(
            &format!("{}/auth/signup", api_prefix()),
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.post_json(
            &format!("{}/auth/signin", api_prefix()),
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.post_empty(&format!("{}/auth/signout", api_prefix()))
            .await
    }

    pub async fn current_user(&self) -> Result<AuthUser> {
        self.get(&format!("{}/auth/user", api_prefix()), &[]).await
    }

    pub async fn create_company(&self, name: &str) -> Result<CreateCompanyResponse> {
        self.post_json(
            &format!("{}/companies", api_prefix()),
            &json!({ "name": name }),
        )
        .await
    }

    pub async fn list_members(&self, company_id: Uuid) -> Result<Vec<CompanyMembership>> {
        self.get(
            &format!("{}/companies/{}/members", api_prefix(), company_id),
            &[],
        )
        .await
    }

    pub async fn create_invitation(
        &self,
        company_id: Uuid,
        email: &str,
        role: InvitationRole,
        message: Option<&str>,
        expires_in_days: Option<i64>,
    ) -> Result<InvitationResponse> {
        self.post_json(
            &format!("{}/companies/{}/invitations", api_prefix(), company_id),
            &json!({
                "email": email,
                "role": role,
                "message": message,
                "expires_in_days": expires_in_days,
            }),
        )
        .await
    }

    pub async fn list_invitations(&self, company_id: Uuid) -> Result<Vec<InvitationResponse>> {
        self.get(
            &format!("{}/companies/{}/invitations", api_prefix(), company_id),
            &[],
        )
        .await
    }

    /// Pending invitations addressed to the signed-in user's email.
    pub async fn my_invitations(&self) -> Result<Vec<InvitationWithCompany>> {
        self.get(&format!("{}/invitations/mine", api_prefix()), &[])
            .await
    }

    pub async fn extend_invitation(
        &self,
        invitation_id: Uuid,
        days: i64,
    ) -> Result<InvitationResponse> {
        self.post_json(
            &format!("{}/invitations/{}/extend", api_prefix(), invitation_id),
            &json!({ "days": days }),
        )
        .await
    }

    pub async fn update_message(
        &self,
        invitation_id: Uuid,
        message: Option<&str>,
    ) -> Result<InvitationResponse> {
        self.patch_json(
            &format!("{}/invitations/{}/message", api_prefix(), invitation_id),
            &json!({ "message": message }),
        )
        .await
    }

    pub async fn cancel_invitation(&self, invitation_id: Uuid) -> Result<()> {
        self.delete(&format!("{}/invitations/{}", api_prefix(), invitation_id))
            .await
    }

    /// Load the join page for a token; auto-joins when the signed-in email matches.
    pub async fn view_invitation(&self, token: &str) -> Result<JoinResponse> {
        self.get("/join", &[("token", token.to_string())]).await
    }

    /// Join explicitly, regardless of which email the invitation was sent to.
    pub async fn join(&self, token: &str) -> Result<JoinResponse> {
        self.post_json("/join", &json!({ "token": token })).await
    }
}
