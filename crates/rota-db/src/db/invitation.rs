use chrono::{DateTime, Utc};
use rota_core::models::{Company, Invitation, InvitationWithCompany, NewInvitation};
use rota_core::{StoreError, StoreResult};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

/// Storage operations on company invitations.
///
/// Implementations never interpret status beyond what each method names: the
/// acceptance write and the delete are unconditional.
#[async_trait::async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn insert(&self, invitation: NewInvitation) -> StoreResult<Invitation>;

    /// Pending, unexpired invitation joined with its company.
    async fn get_pending_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<InvitationWithCompany>;

    /// Invitation by token regardless of status or expiry.
    async fn get_by_token(&self, token: &str) -> StoreResult<Invitation>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invitation>;

    /// All invitations of a company, newest first.
    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<Invitation>>;

    /// Pending, unexpired invitations addressed to a normalized email.
    async fn list_pending_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithCompany>>;

    /// Set status to accepted and stamp who and when. `message`, when present,
    /// replaces the stored one.
    async fn mark_accepted(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        accepted_at: DateTime<Utc>,
        message: Option<String>,
    ) -> StoreResult<Invitation>;

    async fn update_message(&self, id: Uuid, message: Option<String>) -> StoreResult<Invitation>;

    async fn update_expiry(&self, id: Uuid, expires_at: DateTime<Utc>)
        -> StoreResult<Invitation>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Mark every pending invitation with `expires_at <= now` as expired.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[derive(FromRow)]
struct InvitationCompanyRow {
    #[sqlx(flatten)]
    invitation: Invitation,
    company_name: String,
    company_created_at: DateTime<Utc>,
}

impl From<InvitationCompanyRow> for InvitationWithCompany {
    fn from(row: InvitationCompanyRow) -> Self {
        let company = Company {
            id: row.invitation.company_id,
            name: row.company_name,
            created_at: row.company_created_at,
        };
        InvitationWithCompany {
            invitation: row.invitation,
            company,
        }
    }
}

fn invitation_not_found() -> StoreError {
    StoreError::NotFound("invitation not found".to_string())
}

#[derive(Clone)]
pub struct PostgresInvitationRepository {
    pool: PgPool,
}

impl PostgresInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    #[tracing::instrument(
        skip(self, invitation),
        fields(db.table = "company_invitations", db.operation = "insert", company_id = %invitation.company_id)
    )]
    async fn insert(&self, invitation: NewInvitation) -> StoreResult<Invitation> {
        let created = sqlx::query_as::<Postgres, Invitation>(
            r#"
            INSERT INTO company_invitations (
                company_id, invited_email, role, message, invitation_token,
                status, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING *
            "#,
        )
        .bind(invitation.company_id)
        .bind(&invitation.invited_email)
        .bind(invitation.role)
        .bind(&invitation.message)
        .bind(&invitation.invitation_token)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert invitation");
            StoreError::from(e)
        })?;

        Ok(created)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "company_invitations", db.operation = "select"))]
    async fn get_pending_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<InvitationWithCompany> {
        let row = sqlx::query_as::<Postgres, InvitationCompanyRow>(
            r#"
            SELECT i.*, c.name AS company_name, c.created_at AS company_created_at
            FROM company_invitations i
            JOIN companies c ON c.id = i.company_id
            WHERE i.invitation_token = $1
              AND i.status = 'pending'
              AND i.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get pending invitation by token");
            StoreError::from(e)
        })?;

        row.map(InvitationWithCompany::from)
            .ok_or_else(invitation_not_found)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "company_invitations", db.operation = "select"))]
    async fn get_by_token(&self, token: &str) -> StoreResult<Invitation> {
        sqlx::query_as::<Postgres, Invitation>(
            "SELECT * FROM company_invitations WHERE invitation_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get invitation by token");
            StoreError::from(e)
        })?
        .ok_or_else(invitation_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_invitations", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invitation> {
        sqlx::query_as::<Postgres, Invitation>("SELECT * FROM company_invitations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to get invitation by id");
                StoreError::from(e)
            })?
            .ok_or_else(invitation_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_invitations", db.operation = "select"))]
    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let invitations = sqlx::query_as::<Postgres, Invitation>(
            r#"
            SELECT * FROM company_invitations
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list invitations by company");
            StoreError::from(e)
        })?;

        Ok(invitations)
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "company_invitations", db.operation = "select"))]
    async fn list_pending_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithCompany>> {
        let rows = sqlx::query_as::<Postgres, InvitationCompanyRow>(
            r#"
            SELECT i.*, c.name AS company_name, c.created_at AS company_created_at
            FROM company_invitations i
            JOIN companies c ON c.id = i.company_id
            WHERE i.invited_email = $1
              AND i.status = 'pending'
              AND i.expires_at > $2
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(email)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list pending invitations by email");
            StoreError::from(e)
        })?;

        Ok(rows.into_iter().map(InvitationWithCompany::from).collect())
    }

    #[tracing::instrument(skip(self, message), fields(db.table = "company_invitations", db.operation = "update"))]
    async fn mark_accepted(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        accepted_at: DateTime<Utc>,
        message: Option<String>,
    ) -> StoreResult<Invitation> {
        let invitation = sqlx::query_as::<Postgres, Invitation>(
            r#"
            UPDATE company_invitations
            SET status = 'accepted',
                accepted_at = $2,
                accepted_by = $3,
                message = COALESCE($4, message)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(accepted_at)
        .bind(accepted_by)
        .bind(&message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, invitation_id = %id, "Failed to mark invitation accepted");
            StoreError::from(e)
        })?
        .ok_or_else(invitation_not_found)?;

        Ok(invitation)
    }

    #[tracing::instrument(skip(self, message), fields(db.table = "company_invitations", db.operation = "update"))]
    async fn update_message(&self, id: Uuid, message: Option<String>) -> StoreResult<Invitation> {
        sqlx::query_as::<Postgres, Invitation>(
            "UPDATE company_invitations SET message = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, invitation_id = %id, "Failed to update invitation message");
            StoreError::from(e)
        })?
        .ok_or_else(invitation_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_invitations", db.operation = "update"))]
    async fn update_expiry(
        &self,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invitation> {
        sqlx::query_as::<Postgres, Invitation>(
            "UPDATE company_invitations SET expires_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, invitation_id = %id, "Failed to update invitation expiry");
            StoreError::from(e)
        })?
        .ok_or_else(invitation_not_found)
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_invitations", db.operation = "delete"))]
    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM company_invitations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, invitation_id = %id, "Failed to delete invitation");
                StoreError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "company_invitations", db.operation = "update"))]
    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE company_invitations
            SET status = 'expired'
            WHERE status = 'pending' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to expire overdue invitations");
            StoreError::from(e)
        })?;

        Ok(result.rows_affected())
    }
}
