//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env` via
//! `dotenvy`). `Config::from_source` takes an arbitrary lookup so tests can build
//! a configuration without touching global state.

use std::collections::HashMap;
use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const MIN_JWT_SECRET_LEN: usize = 32;
const APP_BASE_URL: &str = "http://localhost:3000";
const INVITATION_DEFAULT_EXPIRY_DAYS: i64 = 7;
const INVITATION_SWEEP_INTERVAL_SECS: u64 = 300;
const SMTP_PORT: u16 = 587;

/// Which backend the repositories talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid store backend: {}", s)),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StoreBackend::Postgres => write!(f, "postgres"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Outbound email (invitation notifications)
#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

impl EmailConfig {
    /// Enabled and has the minimum needed to open a transport.
    pub fn is_configured(&self) -> bool {
        self.enabled && self.smtp_host.is_some() && self.smtp_from.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Base of the links placed in invitation emails
    pub app_base_url: String,
    pub invitation_default_expiry_days: i64,
    /// Interval between expiry sweeps. 0 = disabled.
    pub invitation_sweep_interval_secs: u64,
    /// Re-read the membership after writing it during a join
    pub join_verify_membership: bool,
    pub email: EmailConfig,
    pub log_format: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_lowercase())
        .and_then(|v| match v.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from a map of variables; anything absent takes its default.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        Self::from_source(|key| vars.get(key).cloned())
    }

    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = var("DATABASE_URL");
        let store_backend = match var("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };

        let email = EmailConfig {
            enabled: parse_bool(var("EMAIL_ENABLED"), false),
            smtp_host: var("SMTP_HOST"),
            smtp_port: var("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(SMTP_PORT),
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM"),
            smtp_tls: parse_bool(var("SMTP_TLS"), true),
        };

        let config = AppConfig {
            environment,
            server_port: var("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            store_backend,
            database_url,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: var("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: var("JWT_EXPIRY_HOURS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(JWT_EXPIRY_HOURS),
            app_base_url: var("APP_BASE_URL")
                .unwrap_or_else(|| APP_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            invitation_default_expiry_days: var("INVITATION_DEFAULT_EXPIRY_DAYS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(INVITATION_DEFAULT_EXPIRY_DAYS),
            invitation_sweep_interval_secs: var("INVITATION_SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(INVITATION_SWEEP_INTERVAL_SECS),
            join_verify_membership: parse_bool(var("JOIN_VERIFY_MEMBERSHIP"), false),
            email,
            log_format: var("LOG_FORMAT")
                .unwrap_or_else(|| "text".to_string())
                .to_lowercase(),
        };

        let config = Config(Box::new(config));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let c = &self.0;

        if c.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if self.is_production() && c.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if c.store_backend == StoreBackend::Postgres {
            match c.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when STORE_BACKEND=postgres"
                    ))
                }
            }
        }

        if !(1..=30).contains(&c.invitation_default_expiry_days) {
            return Err(anyhow::anyhow!(
                "INVITATION_DEFAULT_EXPIRY_DAYS must be between 1 and 30"
            ));
        }

        if c.email.enabled && (c.email.smtp_host.is_none() || c.email.smtp_from.is_none()) {
            return Err(anyhow::anyhow!(
                "EMAIL_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        if !c.app_base_url.starts_with("http://") && !c.app_base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("APP_BASE_URL must be an http(s) URL"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.0.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.0.environment
    }

    pub fn server_port(&self) -> u16 {
        self.0.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.cors_origins
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.0.store_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.0.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.0.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.0.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.0.jwt_expiry_hours
    }

    pub fn app_base_url(&self) -> &str {
        &self.0.app_base_url
    }

    pub fn invitation_default_expiry_days(&self) -> i64 {
        self.0.invitation_default_expiry_days
    }

    pub fn invitation_sweep_interval_secs(&self) -> u64 {
        self.0.invitation_sweep_interval_secs
    }

    pub fn join_verify_membership(&self) -> bool {
        self.0.join_verify_membership
    }

    pub fn email(&self) -> &EmailConfig {
        &self.0.email
    }

    pub fn json_logs(&self) -> bool {
        self.0.log_format == "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_map(&vars(&[("JWT_SECRET", SECRET)])).expect("config");
        assert_eq!(config.server_port(), 4000);
        assert_eq!(config.store_backend(), StoreBackend::Memory);
        assert_eq!(config.app_base_url(), "http://localhost:3000");
        assert_eq!(config.invitation_default_expiry_days(), 7);
        assert_eq!(config.invitation_sweep_interval_secs(), 300);
        assert_eq!(config.jwt_expiry_hours(), 24);
        assert!(!config.join_verify_membership());
        assert!(!config.email().is_configured());
        assert!(!config.json_logs());
        assert!(!config.is_production());
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/rota"),
        ]))
        .expect("config");
        assert_eq!(config.store_backend(), StoreBackend::Postgres);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("STORE_BACKEND", "postgres"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = Config::from_map(&vars(&[("JWT_SECRET", "short")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_missing_jwt_secret_rejected() {
        assert!(Config::from_map(&HashMap::new()).is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let err = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }

    #[test]
    fn test_email_enabled_requires_host_and_from() {
        let err = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("EMAIL_ENABLED", "true"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SMTP_HOST"));

        let config = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("EMAIL_ENABLED", "true"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "noreply@example.com"),
        ]))
        .expect("config");
        assert!(config.email().is_configured());
        assert_eq!(config.email().smtp_port, 587);
    }

    #[test]
    fn test_app_base_url_trailing_slash_trimmed() {
        let config = Config::from_map(&vars(&[
            ("JWT_SECRET", SECRET),
            ("APP_BASE_URL", "https://app.rota.dev/"),
        ]))
        .expect("config");
        assert_eq!(config.app_base_url(), "https://app.rota.dev");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("MEMORY".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(
            "postgresql".parse::<StoreBackend>().unwrap(),
            StoreBackend::Postgres
        );
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }
}
