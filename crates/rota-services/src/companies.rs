use std::sync::Arc;

use chrono::Utc;
use rota_core::models::{Company, CompanyMembership, UserProfile};
use rota_core::validation::validate_company_name;
use rota_core::{AppError, StoreError};
use rota_db::{CompanyRepository, MembershipRepository};
use uuid::Uuid;

#[derive(Clone)]
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl CompanyService {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            companies,
            memberships,
        }
    }

    pub fn repository(&self) -> Arc<dyn CompanyRepository> {
        self.companies.clone()
    }

    /// The creator becomes the company's owner.
    #[tracing::instrument(skip(self, creator), fields(creator = %creator.id))]
    pub async fn create_company(
        &self,
        name: &str,
        creator: &UserProfile,
    ) -> Result<(Company, CompanyMembership), AppError> {
        validate_company_name(name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let created = self
            .companies
            .create_with_owner(name.trim(), creator.id, Utc::now())
            .await?;
        Ok(created)
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<Company, AppError> {
        self.companies
            .get_by_id(company_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AppError::NotFound("Company not found".to_string()),
                other => other.into(),
            })
    }

    async fn active_membership(
        &self,
        company_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Option<CompanyMembership>, AppError> {
        match self.memberships.get(company_id, profile_id).await {
            Ok(membership) if membership.is_active => Ok(Some(membership)),
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Any active membership.
    pub async fn require_member(
        &self,
        company_id: Uuid,
        profile_id: Uuid,
    ) -> Result<CompanyMembership, AppError> {
        self.active_membership(company_id, profile_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this company".to_string()))
    }

    /// Active owner or admin membership.
    pub async fn require_manager(
        &self,
        company_id: Uuid,
        profile_id: Uuid,
    ) -> Result<CompanyMembership, AppError> {
        match self.active_membership(company_id, profile_id).await? {
            Some(membership) if membership.role.can_manage_invitations() => Ok(membership),
            _ => Err(AppError::Forbidden(
                "Only company owners and admins can manage invitations".to_string(),
            )),
        }
    }

    pub async fn list_members(&self, company_id: Uuid) -> Result<Vec<CompanyMembership>, AppError> {
        Ok(self.memberships.list_by_company(company_id).await?)
    }
}
