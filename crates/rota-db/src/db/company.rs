use chrono::{DateTime, Utc};
use rota_core::models::{Company, CompanyMembership, MembershipRole, UpsertMembership};
use rota_core::{StoreError, StoreResult};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Insert a company and its owner membership atomically.
    async fn create_with_owner(
        &self,
        name: &str,
        owner_profile_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<(Company, CompanyMembership)>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Company>;
}

/// Memberships are keyed on (company_id, user_profile_id).
#[async_trait::async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert or overwrite role, is_active and joined_at. Last write wins,
    /// except that an existing `owner` keeps its role.
    async fn upsert(&self, membership: UpsertMembership) -> StoreResult<CompanyMembership>;

    async fn get(&self, company_id: Uuid, user_profile_id: Uuid)
        -> StoreResult<CompanyMembership>;

    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMembership>>;
}

#[derive(Clone)]
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    #[tracing::instrument(skip(self), fields(db.table = "companies", db.operation = "insert"))]
    async fn create_with_owner(
        &self,
        name: &str,
        owner_profile_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<(Company, CompanyMembership)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin company transaction");
            StoreError::from(e)
        })?;

        let company = sqlx::query_as::<Postgres, Company>(
            "INSERT INTO companies (name, created_at) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert company");
            StoreError::from(e)
        })?;

        let membership = sqlx::query_as::<Postgres, CompanyMembership>(
            r#"
            INSERT INTO company_members (company_id, user_profile_id, role, is_active, joined_at)
            VALUES ($1, $2, $3, true, $4)
            RETURNING *
            "#,
        )
        .bind(company.id)
        .bind(owner_profile_id)
        .bind(MembershipRole::Owner)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, company_id = %company.id, "Failed to insert owner membership");
            StoreError::from(e)
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit company transaction");
            StoreError::from(e)
        })?;

        tracing::info!(company_id = %company.id, owner = %owner_profile_id, "Company created");

        Ok((company, membership))
    }

    #[tracing::instrument(skip(self), fields(db.table = "companies", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Company> {
        sqlx::query_as::<Postgres, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, company_id = %id, "Failed to get company");
                StoreError::from(e)
            })?
            .ok_or_else(|| StoreError::NotFound("company not found".to_string()))
    }
}

#[derive(Clone)]
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    #[tracing::instrument(
        skip(self, membership),
        fields(
            db.table = "company_members",
            db.operation = "upsert",
            company_id = %membership.company_id,
            user_profile_id = %membership.user_profile_id
        )
    )]
    async fn upsert(&self, membership: UpsertMembership) -> StoreResult<CompanyMembership> {
        sqlx::query_as::<Postgres, CompanyMembership>(
            r#"
            INSERT INTO company_members (company_id, user_profile_id, role, is_active, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (company_id, user_profile_id) DO UPDATE
            SET role = CASE
                    WHEN company_members.role = 'owner' THEN company_members.role
                    ELSE EXCLUDED.role
                END,
                is_active = EXCLUDED.is_active,
                joined_at = EXCLUDED.joined_at
            RETURNING *
            "#,
        )
        .bind(membership.company_id)
        .bind(membership.user_profile_id)
        .bind(membership.role)
        .bind(membership.is_active)
        .bind(membership.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to upsert membership");
            StoreError::from(e)
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_members", db.operation = "select"))]
    async fn get(
        &self,
        company_id: Uuid,
        user_profile_id: Uuid,
    ) -> StoreResult<CompanyMembership> {
        sqlx::query_as::<Postgres, CompanyMembership>(
            "SELECT * FROM company_members WHERE company_id = $1 AND user_profile_id = $2",
        )
        .bind(company_id)
        .bind(user_profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get membership");
            StoreError::from(e)
        })?
        .ok_or_else(|| StoreError::NotFound("membership not found".to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_members", db.operation = "select"))]
    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMembership>> {
        sqlx::query_as::<Postgres, CompanyMembership>(
            r#"
            SELECT * FROM company_members
            WHERE company_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list memberships");
            StoreError::from(e)
        })
    }
}
