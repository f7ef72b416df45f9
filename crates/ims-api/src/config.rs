//! # Server Configuration
//!
//! Command-line arguments for the `ims-api` binary, each with an
//! environment-variable fallback.

use clap::{Parser, ValueEnum};

use crate::auth::SecretToken;
use crate::state::AppConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// IMS product lifecycle service.
#[derive(Parser, Clone)]
#[command(name = "ims-api", version, about, long_about = None)]
pub struct ServerArgs {
    /// Port to bind the HTTP server to.
    #[arg(long, env = "IMS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// PostgreSQL connection URL. In-memory storage when unset.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Shared bearer secret. Authentication is disabled when unset.
    #[arg(long, env = "IMS_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Log output format.
    #[arg(long, env = "IMS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Requests per caller per minute.
    #[arg(long, env = "IMS_RATE_LIMIT", default_value_t = 1000)]
    pub rate_limit: u64,

    /// Serve Prometheus metrics at /metrics.
    #[arg(
        long = "metrics",
        env = "IMS_METRICS_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for ServerArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerArgs")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "[REDACTED]"))
            .field("log_format", &self.log_format)
            .field("rate_limit", &self.rate_limit)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl ServerArgs {
    /// The application configuration these arguments describe.
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            port: self.port,
            auth_secret: self
                .auth_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(SecretToken::new),
            rate_limit: self.rate_limit,
            metrics_enabled: self.metrics_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = ServerArgs::try_parse_from(["ims-api"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.rate_limit, 1000);
        assert!(args.metrics_enabled);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn flags_override_defaults() {
        let args = ServerArgs::try_parse_from([
            "ims-api",
            "--port",
            "9000",
            "--auth-secret",
            "s3cret",
            "--log-format",
            "json",
            "--metrics",
            "false",
        ])
        .unwrap();
        let config = args.app_config();
        assert_eq!(config.port, 9000);
        assert!(config.auth_secret.is_some());
        assert!(!config.metrics_enabled);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_secret_disables_auth() {
        let args = ServerArgs::try_parse_from(["ims-api", "--auth-secret", ""]).unwrap();
        assert!(args.app_config().auth_secret.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let args = ServerArgs::try_parse_from([
            "ims-api",
            "--auth-secret",
            "hunter2",
            "--database-url",
            "postgres://u:pw@db/ims",
        ])
        .unwrap();
        let debug = format!("{args:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pw@db"));
    }
}
