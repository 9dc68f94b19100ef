//! Which join-page panel to show, derived from the resolution state, the
//! viewer, and the join session flags. Pure: no I/O.

use chrono::{DateTime, Utc};
use rota_core::models::{InvitationRole, InvitationStatus};
use rota_core::validation::normalize_email;
use serde::Serialize;
use utoipa::ToSchema;

use crate::join::{JoinSnapshot, Viewer};
use crate::resolution::{ResolutionState, ResolvedInvitation};

/// What the page shows about the invitation itself
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InvitationSummary {
    pub company_name: String,
    pub invited_email: String,
    pub role: InvitationRole,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<&ResolvedInvitation> for InvitationSummary {
    fn from(resolved: &ResolvedInvitation) -> Self {
        InvitationSummary {
            company_name: resolved.company.name.clone(),
            invited_email: resolved.invitation.invited_email.clone(),
            role: resolved.invitation.role,
            status: resolved.invitation.status,
            message: resolved.invitation.message.clone(),
            expires_at: resolved.invitation.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum JoinPageView {
    Loading,
    /// Shown with a "Go Home" action
    Error {
        message: String,
    },
    Expired {
        invitation: InvitationSummary,
    },
    SignInRequired {
        invitation: InvitationSummary,
        sign_in_url: String,
        sign_up_url: String,
    },
    EmailMismatch {
        invitation: InvitationSummary,
        invited_email: String,
        viewer_email: String,
    },
    Redirecting,
    Joined {
        redirect_to: String,
    },
    ReadyToJoin {
        invitation: InvitationSummary,
        is_joining: bool,
        error: Option<String>,
    },
}

/// `/<page>?token=..&email=..&redirect=/join?token=..`, values percent-encoded.
pub fn auth_url(page: &str, token: &str, invited_email: &str) -> String {
    let redirect = format!("/join?token={}", token);
    format!(
        "/{}?token={}&email={}&redirect={}",
        page,
        urlencoding::encode(token),
        urlencoding::encode(invited_email),
        urlencoding::encode(&redirect)
    )
}

impl JoinPageView {
    pub fn derive(
        resolution: &ResolutionState,
        viewer: &Viewer,
        session: &JoinSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let resolved = match resolution {
            ResolutionState::Loading => return JoinPageView::Loading,
            ResolutionState::Failed(message) | ResolutionState::NotFound(message) => {
                return JoinPageView::Error {
                    message: message.clone(),
                }
            }
            ResolutionState::Resolved(resolved) => resolved,
        };
        let invitation = InvitationSummary::from(resolved);

        if resolved.is_expired(now) {
            return JoinPageView::Expired { invitation };
        }

        let viewer_email = match viewer.email() {
            Some(email) if viewer.is_authenticated() => email,
            _ => {
                let token = &resolved.invitation.invitation_token;
                let email = &resolved.invitation.invited_email;
                return JoinPageView::SignInRequired {
                    sign_in_url: auth_url("signin", token, email),
                    sign_up_url: auth_url("signup", token, email),
                    invitation,
                };
            }
        };

        let invited_email = normalize_email(&resolved.invitation.invited_email);
        if viewer_email != invited_email {
            return JoinPageView::EmailMismatch {
                invitation,
                invited_email,
                viewer_email,
            };
        }

        if let Some(outcome) = &session.outcome {
            return JoinPageView::Joined {
                redirect_to: outcome.redirect_to.clone(),
            };
        }
        if session.is_auto_accepting || (session.has_auto_accepted && session.error.is_none()) {
            return JoinPageView::Redirecting;
        }

        JoinPageView::ReadyToJoin {
            invitation,
            is_joining: session.is_joining,
            error: session.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::JoinOutcome;
    use chrono::Duration;
    use rota_core::models::{AuthUser, Company, CompanyMembership, Invitation, MembershipRole};
    use uuid::Uuid;

    fn resolved(expires_in: Duration) -> ResolutionState {
        let now = Utc::now();
        let company_id = Uuid::new_v4();
        ResolutionState::Resolved(ResolvedInvitation {
            invitation: Invitation {
                id: Uuid::new_v4(),
                company_id,
                invited_email: "bob@co.com".to_string(),
                role: InvitationRole::Member,
                message: None,
                invitation_token: "ab".repeat(32),
                status: InvitationStatus::Pending,
                expires_at: now + expires_in,
                created_at: now,
                accepted_at: None,
                accepted_by: None,
            },
            company: Company {
                id: company_id,
                name: "Acme".to_string(),
                created_at: now,
            },
        })
    }

    fn viewer(email: &str) -> Viewer {
        let now = Utc::now();
        Viewer::signed_in(
            "token",
            AuthUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                created_at: now,
                updated_at: now,
            },
        )
    }

    fn derive(state: &ResolutionState, viewer: &Viewer, session: &JoinSnapshot) -> JoinPageView {
        JoinPageView::derive(state, viewer, session, Utc::now())
    }

    #[test]
    fn test_loading_and_error_take_priority() {
        let session = JoinSnapshot::default();
        assert_eq!(
            derive(&ResolutionState::Loading, &viewer("bob@co.com"), &session),
            JoinPageView::Loading
        );
        assert_eq!(
            derive(
                &ResolutionState::NotFound("Invitation not found or has expired".into()),
                &Viewer::anonymous(),
                &session
            ),
            JoinPageView::Error {
                message: "Invitation not found or has expired".into()
            }
        );
    }

    #[test]
    fn test_expired_before_sign_in() {
        let view = derive(
            &resolved(Duration::hours(-1)),
            &Viewer::anonymous(),
            &JoinSnapshot::default(),
        );
        assert!(matches!(view, JoinPageView::Expired { .. }));
    }

    #[test]
    fn test_sign_in_urls_carry_token_email_and_redirect() {
        let view = derive(
            &resolved(Duration::days(7)),
            &Viewer::anonymous(),
            &JoinSnapshot::default(),
        );
        let token = "ab".repeat(32);
        match view {
            JoinPageView::SignInRequired {
                sign_in_url,
                sign_up_url,
                ..
            } => {
                assert_eq!(
                    sign_in_url,
                    format!(
                        "/signin?token={}&email=bob%40co.com&redirect=%2Fjoin%3Ftoken%3D{}",
                        token, token
                    )
                );
                assert!(sign_up_url.starts_with("/signup?token="));
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_email_mismatch() {
        let view = derive(
            &resolved(Duration::days(7)),
            &viewer("carol@co.com"),
            &JoinSnapshot::default(),
        );
        match view {
            JoinPageView::EmailMismatch {
                invited_email,
                viewer_email,
                ..
            } => {
                assert_eq!(invited_email, "bob@co.com");
                assert_eq!(viewer_email, "carol@co.com");
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_matching_viewer_sees_join_states() {
        let state = resolved(Duration::days(7));
        let bob = viewer("Bob@Co.com");

        let ready = derive(&state, &bob, &JoinSnapshot::default());
        assert!(matches!(
            ready,
            JoinPageView::ReadyToJoin {
                is_joining: false,
                error: None,
                ..
            }
        ));

        let auto = JoinSnapshot {
            has_auto_accepted: true,
            is_auto_accepting: true,
            is_joining: true,
            ..Default::default()
        };
        assert_eq!(derive(&state, &bob, &auto), JoinPageView::Redirecting);

        let joined = JoinSnapshot {
            has_auto_accepted: true,
            outcome: Some(JoinOutcome {
                membership: CompanyMembership {
                    company_id: Uuid::new_v4(),
                    user_profile_id: Uuid::new_v4(),
                    role: MembershipRole::Member,
                    is_active: true,
                    joined_at: Utc::now(),
                },
                redirect_to: "/dashboard?joined=true".into(),
            }),
            ..Default::default()
        };
        assert_eq!(
            derive(&state, &bob, &joined),
            JoinPageView::Joined {
                redirect_to: "/dashboard?joined=true".into()
            }
        );
    }

    #[test]
    fn test_failed_auto_accept_falls_back_to_manual_join() {
        let failed = JoinSnapshot {
            has_auto_accepted: true,
            error: Some("Failed to access database".into()),
            ..Default::default()
        };
        let view = derive(&resolved(Duration::days(7)), &viewer("bob@co.com"), &failed);
        assert!(matches!(
            view,
            JoinPageView::ReadyToJoin { error: Some(_), .. }
        ));
    }
}
