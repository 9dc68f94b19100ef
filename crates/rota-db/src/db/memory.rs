//! In-memory backend
//!
//! Implements every repository trait over one shared state so a single
//! `MemoryStore` can back a whole `Repositories` bundle. Used with
//! `STORE_BACKEND=memory` and by the test suites, which can inject failures per
//! operation and count calls.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rota_core::models::{
    AuthUserRecord, Company, CompanyMembership, EnsureProfile, Invitation, InvitationStatus,
    InvitationWithCompany, MembershipRole, NewInvitation, UpsertMembership, UserProfile,
};
use rota_core::{StoreError, StoreResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AuthUserRepository, CompanyRepository, InvitationRepository, MembershipRepository,
    ProfileRepository,
};

#[derive(Default)]
struct MemoryState {
    companies: HashMap<Uuid, Company>,
    invitations: HashMap<Uuid, Invitation>,
    memberships: HashMap<(Uuid, Uuid), CompanyMembership>,
    profiles: HashMap<Uuid, UserProfile>,
    auth_users: HashMap<Uuid, AuthUserRecord>,
    failures: HashMap<String, StoreError>,
    calls: HashMap<String, usize>,
}

impl MemoryState {
    /// Record a call and return the injected failure, if any.
    fn enter(&mut self, op: &str) -> StoreResult<()> {
        *self.calls.entry(op.to_string()).or_insert(0) += 1;
        match self.failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn with_company(&self, invitation: &Invitation) -> Option<InvitationWithCompany> {
        self.companies
            .get(&invitation.company_id)
            .map(|company| InvitationWithCompany {
                invitation: invitation.clone(),
                company: company.clone(),
            })
    }

    fn invitation_mut(&mut self, id: Uuid) -> StoreResult<&mut Invitation> {
        self.invitations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("invitation not found".to_string()))
    }

    fn auth_user_mut(&mut self, id: Uuid) -> StoreResult<&mut AuthUserRecord> {
        self.auth_users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user not found".to_string()))
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `op` (e.g. `"memberships.upsert"`) fail with `err`.
    pub async fn fail_on(&self, op: &str, err: StoreError) {
        self.state.lock().await.failures.insert(op.to_string(), err);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Number of calls made to `op` so far, failed ones included.
    pub async fn calls(&self, op: &str) -> usize {
        self.state.lock().await.calls.get(op).copied().unwrap_or(0)
    }

    pub async fn invitation(&self, id: Uuid) -> Option<Invitation> {
        self.state.lock().await.invitations.get(&id).cloned()
    }

    pub async fn memberships(&self) -> Vec<CompanyMembership> {
        self.state.lock().await.memberships.values().cloned().collect()
    }

    pub async fn profiles(&self) -> Vec<UserProfile> {
        self.state.lock().await.profiles.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl InvitationRepository for MemoryStore {
    async fn insert(&self, invitation: NewInvitation) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.insert")?;

        if state
            .invitations
            .values()
            .any(|existing| existing.invitation_token == invitation.invitation_token)
        {
            return Err(StoreError::Conflict(
                "duplicate invitation token".to_string(),
            ));
        }

        let created = Invitation {
            id: Uuid::new_v4(),
            company_id: invitation.company_id,
            invited_email: invitation.invited_email,
            role: invitation.role,
            message: invitation.message,
            invitation_token: invitation.invitation_token,
            status: InvitationStatus::Pending,
            expires_at: invitation.expires_at,
            created_at: invitation.created_at,
            accepted_at: None,
            accepted_by: None,
        };
        state.invitations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_pending_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<InvitationWithCompany> {
        let mut state = self.state.lock().await;
        state.enter("invitations.get_pending_by_token")?;

        state
            .invitations
            .values()
            .find(|i| {
                i.invitation_token == token
                    && i.status == InvitationStatus::Pending
                    && i.expires_at > now
            })
            .and_then(|i| state.with_company(i))
            .ok_or_else(|| StoreError::NotFound("invitation not found".to_string()))
    }

    async fn get_by_token(&self, token: &str) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.get_by_token")?;

        state
            .invitations
            .values()
            .find(|i| i.invitation_token == token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("invitation not found".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.get_by_id")?;
        state.invitation_mut(id).map(|i| i.clone())
    }

    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let mut state = self.state.lock().await;
        state.enter("invitations.list_by_company")?;

        let mut invitations: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|i| i.company_id == company_id)
            .cloned()
            .collect();
        newest_first(&mut invitations, |i| i.created_at);
        Ok(invitations)
    }

    async fn list_pending_by_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithCompany>> {
        let mut state = self.state.lock().await;
        state.enter("invitations.list_pending_by_email")?;

        let mut rows: Vec<InvitationWithCompany> = state
            .invitations
            .values()
            .filter(|i| {
                i.invited_email == email
                    && i.status == InvitationStatus::Pending
                    && i.expires_at > now
            })
            .filter_map(|i| state.with_company(i))
            .collect();
        newest_first(&mut rows, |r| r.invitation.created_at);
        Ok(rows)
    }

    async fn mark_accepted(
        &self,
        id: Uuid,
        accepted_by: Uuid,
        accepted_at: DateTime<Utc>,
        message: Option<String>,
    ) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.mark_accepted")?;

        let invitation = state.invitation_mut(id)?;
        invitation.status = InvitationStatus::Accepted;
        invitation.accepted_at = Some(accepted_at);
        invitation.accepted_by = Some(accepted_by);
        if message.is_some() {
            invitation.message = message;
        }
        Ok(invitation.clone())
    }

    async fn update_message(&self, id: Uuid, message: Option<String>) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.update_message")?;

        let invitation = state.invitation_mut(id)?;
        invitation.message = message;
        Ok(invitation.clone())
    }

    async fn update_expiry(
        &self,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;
        state.enter("invitations.update_expiry")?;

        let invitation = state.invitation_mut(id)?;
        invitation.expires_at = expires_at;
        Ok(invitation.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        state.enter("invitations.delete")?;
        Ok(state.invitations.remove(&id).is_some())
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        state.enter("invitations.expire_overdue")?;

        let mut count = 0;
        for invitation in state.invitations.values_mut() {
            if invitation.status == InvitationStatus::Pending && invitation.expires_at <= now {
                invitation.status = InvitationStatus::Expired;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait::async_trait]
impl CompanyRepository for MemoryStore {
    async fn create_with_owner(
        &self,
        name: &str,
        owner_profile_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<(Company, CompanyMembership)> {
        let mut state = self.state.lock().await;
        state.enter("companies.create_with_owner")?;

        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: at,
        };
        let membership = CompanyMembership {
            company_id: company.id,
            user_profile_id: owner_profile_id,
            role: MembershipRole::Owner,
            is_active: true,
            joined_at: at,
        };
        state.companies.insert(company.id, company.clone());
        state
            .memberships
            .insert((company.id, owner_profile_id), membership.clone());
        Ok((company, membership))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Company> {
        let mut state = self.state.lock().await;
        state.enter("companies.get_by_id")?;

        state
            .companies
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("company not found".to_string()))
    }
}

#[async_trait::async_trait]
impl MembershipRepository for MemoryStore {
    async fn upsert(&self, membership: UpsertMembership) -> StoreResult<CompanyMembership> {
        let mut state = self.state.lock().await;
        state.enter("memberships.upsert")?;

        let key = (membership.company_id, membership.user_profile_id);
        let role = match state.memberships.get(&key) {
            Some(existing) if existing.role == MembershipRole::Owner => MembershipRole::Owner,
            _ => membership.role,
        };
        let row = CompanyMembership {
            company_id: membership.company_id,
            user_profile_id: membership.user_profile_id,
            role,
            is_active: membership.is_active,
            joined_at: membership.joined_at,
        };
        state.memberships.insert(key, row.clone());
        Ok(row)
    }

    async fn get(
        &self,
        company_id: Uuid,
        user_profile_id: Uuid,
    ) -> StoreResult<CompanyMembership> {
        let mut state = self.state.lock().await;
        state.enter("memberships.get")?;

        state
            .memberships
            .get(&(company_id, user_profile_id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound("membership not found".to_string()))
    }

    async fn list_by_company(&self, company_id: Uuid) -> StoreResult<Vec<CompanyMembership>> {
        let mut state = self.state.lock().await;
        state.enter("memberships.list_by_company")?;

        let mut members: Vec<CompanyMembership> = state
            .memberships
            .values()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }
}

#[async_trait::async_trait]
impl ProfileRepository for MemoryStore {
    async fn ensure(&self, profile: EnsureProfile) -> StoreResult<UserProfile> {
        let mut state = self.state.lock().await;
        state.enter("profiles.ensure")?;

        if let Some(existing) = state
            .profiles
            .values()
            .find(|p| p.user_id == profile.user_id)
        {
            return Ok(existing.clone());
        }

        let created = UserProfile {
            id: Uuid::new_v4(),
            user_id: profile.user_id,
            email: profile.email,
            role: profile.role,
            first_name: profile.first_name,
            last_name: profile.last_name,
            is_active: true,
            created_at: Utc::now(),
        };
        state.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> StoreResult<UserProfile> {
        let mut state = self.state.lock().await;
        state.enter("profiles.get_by_user_id")?;

        state
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("profile not found".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<UserProfile> {
        let mut state = self.state.lock().await;
        state.enter("profiles.get_by_id")?;

        state
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("profile not found".to_string()))
    }
}

#[async_trait::async_trait]
impl AuthUserRepository for MemoryStore {
    async fn insert(
        &self,
        email: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord> {
        let mut state = self.state.lock().await;
        state.enter("auth_users.insert")?;

        if state.auth_users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }

        let record = AuthUserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: at,
            updated_at: at,
        };
        state.auth_users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<AuthUserRecord> {
        let mut state = self.state.lock().await;
        state.enter("auth_users.get_by_email")?;

        state
            .auth_users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user not found".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<AuthUserRecord> {
        let mut state = self.state.lock().await;
        state.enter("auth_users.get_by_id")?;
        state.auth_user_mut(id).map(|u| u.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        email: Option<String>,
        password_hash: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<AuthUserRecord> {
        let mut state = self.state.lock().await;
        state.enter("auth_users.update")?;

        if let Some(ref email) = email {
            if state
                .auth_users
                .values()
                .any(|u| u.id != id && &u.email == email)
            {
                return Err(StoreError::Conflict(
                    "a user with this email already exists".to_string(),
                ));
            }
        }

        let user = state.auth_user_mut(id)?;
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        user.updated_at = at;
        Ok(user.clone())
    }
}
