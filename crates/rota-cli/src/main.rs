//! Rota CLI: sign in, manage company invitations, and join companies.
//!
//! Set ROTA_API_URL (default http://localhost:3000) and ROTA_TOKEN. `signup`
//! and `signin` print a session whose `access_token` can be exported as ROTA_TOKEN.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rota_cli::{init_tracing, invitation_token, ApiClient};
use rota_core::models::InvitationRole;
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rota", about = "Rota invitations CLI")]
struct Cli {
    /// Bearer token; overrides ROTA_TOKEN
    #[arg(long, global = true, env = "ROTA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "ROTA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with email and password
    Signin {
        email: String,
        #[arg(long, env = "ROTA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke the current token
    Signout,
    /// Show the signed-in user
    Whoami,
    /// Company operations
    Company {
        #[command(subcommand)]
        sub: CompanyCommands,
    },
    /// Invite someone to a company
    Invite {
        /// Company UUID
        company_id: Uuid,
        /// Email address to invite
        email: String,
        #[arg(long, value_enum, default_value = "member")]
        role: Role,
        /// Personal note included in the email
        #[arg(long)]
        message: Option<String>,
        /// Days until the link expires (1-30)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Invitation management
    Invitations {
        #[command(subcommand)]
        sub: InvitationCommands,
    },
    /// Show what the join page would display for a token or link
    View {
        /// Invitation token or full /join link
        invitation: String,
    },
    /// Join the company behind an invitation token or link
    Join {
        /// Invitation token or full /join link
        invitation: String,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Create a company; you become its owner
    Create { name: String },
    /// List a company's members
    Members { company_id: Uuid },
}

#[derive(Subcommand)]
enum InvitationCommands {
    /// List all invitations of a company
    List { company_id: Uuid },
    /// List pending invitations sent to your email
    Mine,
    /// Push the expiry out to now + days
    Extend {
        invitation_id: Uuid,
        #[arg(long, default_value = "7")]
        days: i64,
    },
    /// Replace the personal message (omit to clear it)
    Message {
        invitation_id: Uuid,
        message: Option<String>,
    },
    /// Delete an invitation
    Cancel { invitation_id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Member,
    Admin,
}

impl From<Role> for InvitationRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Member => InvitationRole::Member,
            Role::Admin => InvitationRole::Admin,
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = ApiClient::from_env()
        .context("Failed to create API client. Set ROTA_API_URL (or API_URL)")?;
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Signup { email, password } => {
            print_json(&client.sign_up(&email, &password).await?)?;
        }
        Commands::Signin { email, password } => {
            print_json(&client.sign_in(&email, &password).await?)?;
        }
        Commands::Signout => {
            client.sign_out().await?;
            print_json(&serde_json::json!({ "success": true }))?;
        }
        Commands::Whoami => {
            print_json(&client.current_user().await?)?;
        }
        Commands::Company { sub } => match sub {
            CompanyCommands::Create { name } => {
                print_json(&client.create_company(&name).await?)?;
            }
            CompanyCommands::Members { company_id } => {
                print_json(&client.list_members(company_id).await?)?;
            }
        },
        Commands::Invite {
            company_id,
            email,
            role,
            message,
            days,
        } => {
            let response = client
                .create_invitation(company_id, &email, role.into(), message.as_deref(), days)
                .await?;
            print_json(&response)?;
        }
        Commands::Invitations { sub } => match sub {
            InvitationCommands::List { company_id } => {
                print_json(&client.list_invitations(company_id).await?)?;
            }
            InvitationCommands::Mine => {
                print_json(&client.my_invitations().await?)?;
            }
            InvitationCommands::Extend {
                invitation_id,
                days,
            } => {
                print_json(&client.extend_invitation(invitation_id, days).await?)?;
            }
            InvitationCommands::Message {
                invitation_id,
                message,
            } => {
                print_json(
                    &client
                        .update_message(invitation_id, message.as_deref())
                        .await?,
                )?;
            }
            InvitationCommands::Cancel { invitation_id } => {
                client.cancel_invitation(invitation_id).await?;
                print_json(&serde_json::json!({
                    "success": true,
                    "message": format!("Invitation {} deleted", invitation_id)
                }))?;
            }
        },
        Commands::View { invitation } => {
            let token = invitation_token(&invitation);
            print_json(&client.view_invitation(&token).await?)?;
        }
        Commands::Join { invitation } => {
            let token = invitation_token(&invitation);
            let response = client.join(&token).await?;
            tracing::debug!(panel = response.panel(), "Join finished");
            print_json(&response)?;
        }
    }

    Ok(())
}
