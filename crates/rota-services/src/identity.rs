//! Identity provider: password sign-up and sign-in, bearer sessions, and
//! auth-state change notifications.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use rota_core::models::{AuthUser, EnsureProfile, ProfileRole, UpdateAuthUser, UserProfile};
use rota_core::validation::{normalize_email, MIN_PASSWORD_LENGTH};
use rota_core::{AppError, StoreError};
use rota_db::{AuthUserRepository, ProfileRepository};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use utoipa::ToSchema;
use uuid::Uuid;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthStateChange {
    SignedIn(AuthUser),
    SignedOut { user_id: Uuid },
    UserUpdated(AuthUser),
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;

    /// `None` when the token is invalid, expired, revoked, or its user is gone.
    async fn get_current_user(&self, access_token: &str) -> Result<Option<AuthUser>, AppError>;

    async fn update_user(
        &self,
        access_token: &str,
        update: UpdateAuthUser,
    ) -> Result<AuthUser, AppError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Create the application profile for an auth identity if it does not exist.
pub async fn ensure_profile(
    profiles: &dyn ProfileRepository,
    user_id: Uuid,
    email: &str,
) -> Result<UserProfile, AppError> {
    profiles
        .ensure(EnsureProfile {
            user_id,
            email: normalize_email(email),
            role: ProfileRole::User,
            first_name: None,
            last_name: None,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user_id, "Failed to ensure user profile");
            AppError::from(e)
        })
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}

/// Identity provider backed by the `auth_users` table with HS256 session tokens.
/// Signed-out token ids are remembered until the token would have expired.
pub struct LocalIdentityProvider {
    users: Arc<dyn AuthUserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
    revoked: Mutex<HashMap<String, i64>>,
    changes: broadcast::Sender<AuthStateChange>,
}

impl LocalIdentityProvider {
    pub fn new(
        users: Arc<dyn AuthUserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        jwt_secret: &str,
        expiry_hours: i64,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            users,
            profiles,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            session_ttl: Duration::hours(expiry_hours),
            revoked: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn issue_session(&self, user: AuthUser) -> Result<AuthSession, AppError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))?;

        Ok(AuthSession {
            access_token,
            token_type: "bearer".to_string(),
            expires_at,
            user,
        })
    }

    /// Claims of a well-formed, unexpired, unrevoked token.
    async fn claims(&self, access_token: &str) -> Option<SessionClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = match decode::<SessionClaims>(access_token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                return None;
            }
        };
        if self.revoked.lock().await.contains_key(&claims.jti) {
            return None;
        }
        Some(claims)
    }

    fn notify(&self, change: AuthStateChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

#[async_trait::async_trait]
impl IdentityProvider for LocalIdentityProvider {
    #[tracing::instrument(skip(self, email, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::InvalidInput("Email is required".to_string()));
        }
        validate_password(password)?;

        let hash = hash_password(password).await?;
        let record = self
            .users
            .insert(&email, &hash, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::Conflict("An account with this email already exists".to_string())
                }
                other => AppError::from(other),
            })?;

        // Profile "trigger": every identity gets exactly one profile.
        ensure_profile(self.profiles.as_ref(), record.id, &record.email).await?;

        let user = AuthUser::from(record);
        tracing::info!(user_id = %user.id, "User signed up");
        let session = self.issue_session(user.clone())?;
        self.notify(AuthStateChange::SignedIn(user));
        Ok(session)
    }

    #[tracing::instrument(skip(self, email, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let record = match self.users.get_by_email(&normalize_email(email)).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Err(invalid()),
            Err(e) => return Err(e.into()),
        };
        if !verify_password(password, &record.password_hash).await? {
            return Err(invalid());
        }

        let user = AuthUser::from(record);
        tracing::info!(user_id = %user.id, "User signed in");
        let session = self.issue_session(user.clone())?;
        self.notify(AuthStateChange::SignedIn(user));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let claims = self
            .claims(access_token)
            .await
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.lock().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti, claims.exp);
        drop(revoked);

        tracing::info!(user_id = %claims.sub, "User signed out");
        self.notify(AuthStateChange::SignedOut {
            user_id: claims.sub,
        });
        Ok(())
    }

    async fn get_current_user(&self, access_token: &str) -> Result<Option<AuthUser>, AppError> {
        let Some(claims) = self.claims(access_token).await else {
            return Ok(None);
        };
        match self.users.get_by_id(claims.sub).await {
            Ok(record) => Ok(Some(record.into())),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: UpdateAuthUser,
    ) -> Result<AuthUser, AppError> {
        let user = self
            .get_current_user(access_token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        let email = update.email.as_deref().map(normalize_email);
        if matches!(email.as_deref(), Some("")) {
            return Err(AppError::InvalidInput("Email cannot be empty".to_string()));
        }
        let password_hash = match update.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password).await?)
            }
            None => None,
        };

        let record = self
            .users
            .update(user.id, email, password_hash, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::Conflict("An account with this email already exists".to_string())
                }
                other => AppError::from(other),
            })?;

        let user = AuthUser::from(record);
        self.notify(AuthStateChange::UserUpdated(user.clone()));
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_db::MemoryStore;

    const SECRET: &str = "test-secret-key-min-32-characters-long";

    fn provider(store: &MemoryStore) -> LocalIdentityProvider {
        LocalIdentityProvider::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            SECRET,
            24,
        )
    }

    #[tokio::test]
    async fn test_sign_up_creates_exactly_one_profile() {
        let store = MemoryStore::new();
        let identity = provider(&store);

        let session = identity.sign_up(" Ann@Co.com ", "password123").await.unwrap();
        assert_eq!(session.user.email, "ann@co.com");

        let profiles = store.profiles().await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].user_id, session.user.id);
        assert_eq!(profiles[0].role, ProfileRole::User);
    }

    #[tokio::test]
    async fn test_sign_in_and_current_user() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        identity.sign_up("ann@co.com", "password123").await.unwrap();

        let wrong = identity.sign_in_with_password("ann@co.com", "nope-nope").await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let session = identity
            .sign_in_with_password("ANN@co.com", "password123")
            .await
            .unwrap();
        let user = identity
            .get_current_user(&session.access_token)
            .await
            .unwrap()
            .expect("signed in");
        assert_eq!(user.email, "ann@co.com");
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        let mut changes = identity.subscribe();
        let session = identity.sign_up("ann@co.com", "password123").await.unwrap();

        identity.sign_out(&session.access_token).await.unwrap();

        assert!(identity
            .get_current_user(&session.access_token)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            changes.recv().await.unwrap(),
            AuthStateChange::SignedIn(_)
        ));
        assert_eq!(
            changes.recv().await.unwrap(),
            AuthStateChange::SignedOut {
                user_id: session.user.id
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_conflicts() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        identity.sign_up("ann@co.com", "password123").await.unwrap();
        let err = identity.sign_up("ann@co.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        let err = identity.sign_up("ann@co.com", "short").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_has_no_user() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        assert!(identity.get_current_user("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_email() {
        let store = MemoryStore::new();
        let identity = provider(&store);
        let session = identity.sign_up("ann@co.com", "password123").await.unwrap();

        let updated = identity
            .update_user(
                &session.access_token,
                UpdateAuthUser {
                    email: Some("Ann.Lee@co.com".into()),
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "ann.lee@co.com");
        assert!(identity
            .sign_in_with_password("ann.lee@co.com", "password123")
            .await
            .is_ok());
    }
}
