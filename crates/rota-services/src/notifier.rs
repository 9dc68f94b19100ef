//! Invitation email notifications.
//!
//! Sending is fire-and-forget from the caller's point of view: a failed send is
//! reported in [`NotificationResult`] and never propagates as an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rota_core::models::InvitationRole;
use rota_core::{Config, EmailConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct InvitationEmail {
    pub to: String,
    pub company_name: String,
    pub inviter_name: String,
    pub invitation_url: String,
    pub role: InvitationRole,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl InvitationEmail {
    pub fn subject(&self) -> String {
        format!(
            "{} invited you to join {} on Rota",
            self.inviter_name, self.company_name
        )
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Hi,\n\n{} has invited you to join {} as {} {}.\n",
            self.inviter_name,
            self.company_name,
            article(self.role),
            self.role
        );
        if let Some(message) = self.message.as_deref() {
            body.push_str(&format!("\nThey wrote:\n\n  {}\n", message));
        }
        body.push_str(&format!(
            "\nAccept the invitation here:\n{}\n\nThis link expires on {}.\n",
            self.invitation_url,
            self.expires_at.format("%B %-d, %Y at %H:%M UTC")
        ));
        body
    }
}

fn article(role: InvitationRole) -> &'static str {
    match role {
        InvitationRole::Admin => "an",
        InvitationRole::Member => "a",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    pub success: bool,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invitation_email(&self, email: &InvitationEmail) -> NotificationResult;
}

/// Logs the email instead of sending it. Used when SMTP is not configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send_invitation_email(&self, email: &InvitationEmail) -> NotificationResult {
        tracing::info!(
            to = %email.to,
            company = %email.company_name,
            inviter = %email.inviter_name,
            role = %email.role,
            url = %email.invitation_url,
            expires_at = %email.expires_at,
            "Invitation email (not sent, SMTP disabled)"
        );
        NotificationResult::sent()
    }
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Returns `None` if email is disabled or the SMTP settings are unusable.
    pub fn from_config(email: &EmailConfig) -> Option<Self> {
        if !email.is_configured() {
            tracing::debug!("Invitation emails disabled (EMAIL_ENABLED=false or SMTP unset)");
            return None;
        }
        let host = email.smtp_host.as_deref()?;
        let from: Mailbox = match email.smtp_from.as_deref()?.parse() {
            Ok(from) => from,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid SMTP_FROM, invitation emails disabled");
                return None;
            }
        };
        let credentials = match (email.smtp_user.as_ref(), email.smtp_password.as_ref()) {
            (Some(user), Some(password)) => Some(Credentials::new(user.clone(), password.clone())),
            _ => None,
        };

        let builder = if email.smtp_tls {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::warn!(error = %e, host = %host, "SMTP relay setup failed");
                    return None;
                }
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let builder = builder.port(email.smtp_port);
        let builder = match credentials {
            Some(credentials) => builder.credentials(credentials),
            None => builder,
        };

        tracing::info!(
            host = %host,
            port = email.smtp_port,
            tls = email.smtp_tls,
            "Invitation email notifier initialized (SMTP)"
        );

        Some(Self {
            mailer: Arc::new(builder.build()),
            from,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send_invitation_email(&self, email: &InvitationEmail) -> NotificationResult {
        let to: Mailbox = match email.to.parse() {
            Ok(to) => to,
            Err(e) => return NotificationResult::failed(format!("Invalid recipient: {}", e)),
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())
        {
            Ok(message) => message,
            Err(e) => return NotificationResult::failed(e.to_string()),
        };

        match self.mailer.send(message).await {
            Ok(_) => {
                tracing::info!(to = %email.to, "Invitation email sent");
                NotificationResult::sent()
            }
            Err(e) => NotificationResult::failed(e.to_string()),
        }
    }
}

/// SMTP when enabled and configured, otherwise the logging stub.
pub fn create_notifier(config: &Config) -> Arc<dyn Notifier> {
    match SmtpNotifier::from_config(config.email()) {
        Some(smtp) => Arc::new(smtp),
        None => Arc::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn email(message: Option<&str>) -> InvitationEmail {
        InvitationEmail {
            to: "bob@co.com".to_string(),
            company_name: "Acme".to_string(),
            inviter_name: "Ann Lee".to_string(),
            invitation_url: format!("http://localhost:3000/join?token={}", "a".repeat(64)),
            role: InvitationRole::Admin,
            message: message.map(String::from),
            expires_at: Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_body_contains_link_role_and_message() {
        let body = email(Some("Welcome aboard")).body();
        assert!(body.contains("join Acme as an admin"));
        assert!(body.contains("/join?token="));
        assert!(body.contains("Welcome aboard"));
        assert!(body.contains("March 8, 2026"));
    }

    #[test]
    fn test_subject_names_inviter_and_company() {
        assert_eq!(
            email(None).subject(),
            "Ann Lee invited you to join Acme on Rota"
        );
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let result = LogNotifier.send_invitation_email(&email(None)).await;
        assert_eq!(result, NotificationResult::sent());
    }

    #[test]
    fn test_smtp_notifier_requires_configuration() {
        assert!(SmtpNotifier::from_config(&EmailConfig::default()).is_none());
    }
}
