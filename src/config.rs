/// Configuration management for the Mirador engagement service
use crate::error::{EngageError, EngageResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub identity: IdentityConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub media_upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub media_directory: PathBuf,
}

/// Authentication configuration
///
/// Tokens are issued by the site's identity provider; this service only
/// verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Actor ids always treated as moderators, in addition to tokens
    /// carrying the moderator scope (comma-separated in the env)
    pub moderator_ids: Vec<String>,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity-profile lookup endpoint
    pub profile_url: String,
    /// Seconds a cached profile stays fresh
    pub profile_cache_ttl: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Per-request quota tiers (requests per second)
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub moderator_rps: u32,
    pub burst_size: u32,
    /// Cooldown between voice submissions from the same actor, seconds
    pub submission_cooldown_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> EngageResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MIRADOR_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("MIRADOR_PORT")
            .unwrap_or_else(|_| "8780".to_string())
            .parse()
            .map_err(|_| EngageError::InvalidInput("Invalid port number".to_string()))?;

        let media_upload_limit = env::var("MIRADOR_MEDIA_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(10 * 1024 * 1024);

        let data_directory: PathBuf = env::var("MIRADOR_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("MIRADOR_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("mirador.sqlite"));
        let media_directory = env::var("MIRADOR_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let jwt_secret = env::var("MIRADOR_JWT_SECRET")
            .map_err(|_| EngageError::InvalidInput("JWT secret required".to_string()))?;

        // Parse moderator ids from comma-separated list
        let moderator_ids = env::var("MIRADOR_MODERATOR_IDS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let profile_url = env::var("MIRADOR_IDENTITY_PROFILE_URL")
            .unwrap_or_else(|_| "http://localhost:9000/profiles".to_string());
        let profile_cache_ttl = env::var("MIRADOR_IDENTITY_CACHE_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let rate_limit_enabled = env::var("MIRADOR_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("MIRADOR_RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("MIRADOR_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let moderator_rps = env::var("MIRADOR_RATE_LIMIT_MODERATOR_RPS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let burst_size = env::var("MIRADOR_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let submission_cooldown_secs = env::var("MIRADOR_SUBMISSION_COOLDOWN_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                media_upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                media_directory,
            },
            authentication: AuthConfig {
                jwt_secret,
                moderator_ids,
            },
            identity: IdentityConfig {
                profile_url,
                profile_cache_ttl,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                moderator_rps,
                burst_size,
                submission_cooldown_secs,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> EngageResult<()> {
        if self.service.hostname.is_empty() {
            return Err(EngageError::InvalidInput(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(EngageError::InvalidInput(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.rate_limit.submission_cooldown_secs == 0 {
            return Err(EngageError::InvalidInput(
                "Submission cooldown must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8780,
                media_upload_limit: 1024,
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/mirador.sqlite".into(),
                media_directory: "./data/media".into(),
            },
            authentication: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                moderator_ids: vec![],
            },
            identity: IdentityConfig {
                profile_url: "http://localhost:9000/profiles".to_string(),
                profile_cache_ttl: 3600,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                moderator_rps: 1000,
                burst_size: 50,
                submission_cooldown_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = test_config();
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let mut config = test_config();
        config.rate_limit.submission_cooldown_secs = 0;
        assert!(config.validate().is_err());
    }
}
