//! In-process invitation event bus over tokio broadcast channels.
//!
//! Subscribers that fall behind lose the oldest events; count views should
//! re-fetch on `Lagged`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Change to the set of invitations or memberships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvitationEvent {
    Created {
        invitation_id: Uuid,
        company_id: Uuid,
        invited_email: String,
    },
    Cancelled {
        invitation_id: Uuid,
    },
    MembershipJoined {
        invitation_id: Uuid,
        company_id: Uuid,
        user_profile_id: Uuid,
    },
}

impl InvitationEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            InvitationEvent::Created { .. } => "invitation_created",
            InvitationEvent::Cancelled { .. } => "invitation_cancelled",
            InvitationEvent::MembershipJoined { .. } => "membership_joined",
        }
    }
}

#[derive(Clone)]
pub struct InvitationEvents {
    sender: broadcast::Sender<InvitationEvent>,
}

impl InvitationEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: InvitationEvent) {
        let name = event.name();
        // No receivers is fine
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "Invitation event published"),
            Err(_) => tracing::trace!(event = name, "Invitation event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvitationEvent> {
        self.sender.subscribe()
    }
}

impl Default for InvitationEvents {
    fn default() -> Self {
        Self::new()
    }
}
