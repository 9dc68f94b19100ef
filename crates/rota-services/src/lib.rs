//! Invitation and join workflow services shared by the API and CLI.

pub mod companies;
pub mod events;
pub mod identity;
pub mod invitations;
pub mod join;
pub mod join_page;
pub mod notifier;
pub mod resolution;

pub use companies::CompanyService;
pub use events::{InvitationEvent, InvitationEvents};
pub use identity::{
    ensure_profile, AuthSession, AuthStateChange, IdentityProvider, LocalIdentityProvider,
};
pub use invitations::{CreateInvitation, InvitationService, DEFAULT_EXPIRY_DAYS};
pub use join::{JoinAttempt, JoinOutcome, JoinService, JoinSession, JoinSnapshot, Viewer};
pub use join_page::{InvitationSummary, JoinPageView};
pub use notifier::{
    create_notifier, InvitationEmail, LogNotifier, NotificationResult, Notifier, SmtpNotifier,
};
pub use resolution::{InvitationResolution, ResolutionState, ResolvedInvitation};
