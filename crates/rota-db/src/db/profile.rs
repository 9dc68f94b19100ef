use chrono::{DateTime, Utc};
use rota_core::models::{AuthUserRecord, EnsureProfile, UserProfile};
use rota_core::{StoreError, StoreResult};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Idempotent upsert keyed on `user_id`. An existing profile is returned
    /// unchanged.
    async fn ensure(&self, profile: EnsureProfile) -> StoreResult<UserProfile>;

    async fn get_by_user_id(&self, user_id: Uuid) -> StoreResult<UserProfile>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<UserProfile>;
}

#[async_trait::async_trait]
pub trait AuthUserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord>;

    async fn get_by_email(&self, email: &str) -> StoreResult<AuthUserRecord>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<AuthUserRecord>;

    async fn update(
        &self,
        id: Uuid,
        email: Option<String>,
        password_hash: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord>;
}

fn profile_not_found() -> StoreError {
    StoreError::NotFound("profile not found".to_string())
}

fn user_not_found() -> StoreError {
    StoreError::NotFound("user not found".to_string())
}

#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[tracing::instrument(
        skip(self, profile),
        fields(db.table = "user_profiles", db.operation = "upsert", user_id = %profile.user_id)
    )]
    async fn ensure(&self, profile: EnsureProfile) -> StoreResult<UserProfile> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<Postgres, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, email, role, first_name, last_name, is_active)
            VALUES ($1, $2, $3, $4, $5, true)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.email)
        .bind(profile.role)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to ensure profile");
            StoreError::from(e)
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_profiles", db.operation = "select"))]
    async fn get_by_user_id(&self, user_id: Uuid) -> StoreResult<UserProfile> {
        sqlx::query_as::<Postgres, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to get profile by user id");
                StoreError::from(e)
            })?
            .ok_or_else(profile_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_profiles", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> StoreResult<UserProfile> {
        sqlx::query_as::<Postgres, UserProfile>("SELECT * FROM user_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to get profile by id");
                StoreError::from(e)
            })?
            .ok_or_else(profile_not_found)
    }
}

#[derive(Clone)]
pub struct PostgresAuthUserRepository {
    pool: PgPool,
}

impl PostgresAuthUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuthUserRepository for PostgresAuthUserRepository {
    #[tracing::instrument(skip(self, password_hash), fields(db.table = "auth_users", db.operation = "insert"))]
    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord> {
        sqlx::query_as::<Postgres, AuthUserRecord>(
            r#"
            INSERT INTO auth_users (email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict("a user with this email already exists".to_string())
            }
            other => {
                tracing::error!(error = %other, "Failed to insert auth user");
                other
            }
        })
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "auth_users", db.operation = "select"))]
    async fn get_by_email(&self, email: &str) -> StoreResult<AuthUserRecord> {
        sqlx::query_as::<Postgres, AuthUserRecord>("SELECT * FROM auth_users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to get auth user by email");
                StoreError::from(e)
            })?
            .ok_or_else(user_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "auth_users", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> StoreResult<AuthUserRecord> {
        sqlx::query_as::<Postgres, AuthUserRecord>("SELECT * FROM auth_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to get auth user by id");
                StoreError::from(e)
            })?
            .ok_or_else(user_not_found)
    }

    #[tracing::instrument(skip(self, email, password_hash), fields(db.table = "auth_users", db.operation = "update"))]
    async fn update(
        &self,
        id: Uuid,
        email: Option<String>,
        password_hash: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord> {
        sqlx::query_as::<Postgres, AuthUserRecord>(
            r#"
            UPDATE auth_users
            SET email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&password_hash)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict("a user with this email already exists".to_string())
            }
            other => {
                tracing::error!(error = %other, "Failed to update auth user");
                other
            }
        })?
        .ok_or_else(user_not_found)
    }
}
