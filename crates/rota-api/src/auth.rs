//! Bearer-token extractors
//!
//! [`AuthContext`] rejects requests without a live session. [`OptionalViewer`]
//! never rejects: a missing, malformed, or expired token yields an anonymous
//! viewer, which is what the join page wants.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use rota_core::models::{AuthUser, UserProfile};
use rota_core::AppError;
use rota_services::{ensure_profile, Viewer};

use crate::error::HttpAppError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header format".to_string()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        )),
    }
}

/// Signed-in caller with their application profile
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub access_token: String,
    pub user: AuthUser,
    pub profile: UserProfile,
}

impl AuthContext {
    pub fn viewer(&self) -> Viewer {
        Viewer::signed_in(self.access_token.clone(), self.user.clone())
    }
}

impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let access_token = bearer_token(parts)?.ok_or_else(|| {
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

        let user = state
            .identity
            .get_current_user(&access_token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        let profile = ensure_profile(state.repositories.profiles.as_ref(), user.id, &user.email)
            .await?;

        Ok(AuthContext {
            access_token,
            user,
            profile,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OptionalViewer(pub Viewer);

impl FromRequestParts<Arc<AppState>> for OptionalViewer {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Some(access_token)) = bearer_token(parts) else {
            return Ok(OptionalViewer(Viewer::anonymous()));
        };
        let viewer = match state.identity.get_current_user(&access_token).await? {
            Some(user) => Viewer::signed_in(access_token, user),
            None => Viewer::anonymous(),
        };
        Ok(OptionalViewer(viewer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/join");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(
            bearer_token(&parts(Some("Bearer abc.def"))).unwrap(),
            Some("abc.def".to_string())
        );
        assert!(bearer_token(&parts(Some("Basic Zm9vOmJhcg=="))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }
}
