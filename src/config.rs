// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets arrive as environment variables (Cloud Run secret bindings or a
//! local `.env` file) and are read once at startup.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Explicit OAuth callback URL registered with Google. When unset, the
    /// callback URL is derived from the request's Host header.
    pub oauth_redirect_url: Option<String>,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region (KMS location)
    pub gcp_region: String,
    /// KMS key ring holding the token encryption key
    pub kms_key_ring: String,
    /// KMS key used for token encryption
    pub kms_key_name: String,
    /// Server port
    pub port: u16,

    // --- Upstream endpoints (overridable for tests) ---
    /// Google Calendar API v3 base URL
    pub google_api_base_url: String,
    /// Google OAuth consent page
    pub google_auth_url: String,
    /// Google OAuth token endpoint
    pub google_token_url: String,
    /// Google OAuth userinfo endpoint
    pub google_userinfo_url: String,
    /// Google OAuth revocation endpoint
    pub google_revoke_url: String,

    // --- Tuning ---
    /// Timeout applied to every outbound HTTP call
    pub upstream_timeout_secs: u64,
    /// Tokens expiring within this many seconds are refreshed
    pub token_refresh_margin_secs: i64,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for signing the OAuth state parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            oauth_redirect_url: None,
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            kms_key_ring: "calendar-sync".to_string(),
            kms_key_name: "token-encryption".to_string(),
            port: 8080,
            google_api_base_url: DEFAULT_GOOGLE_API_BASE_URL.to_string(),
            google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
            google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
            google_userinfo_url: DEFAULT_GOOGLE_USERINFO_URL.to_string(),
            google_revoke_url: DEFAULT_GOOGLE_REVOKE_URL.to_string(),
            upstream_timeout_secs: 5,
            token_refresh_margin_secs: DEFAULT_TOKEN_REFRESH_MARGIN_SECS,
            google_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Point every Google endpoint at a single base URL (a mock server).
    pub fn with_google_base_url(mut self, base: &str) -> Self {
        self.google_api_base_url = format!("{}/calendar/v3", base);
        self.google_auth_url = format!("{}/o/oauth2/v2/auth", base);
        self.google_token_url = format!("{}/token", base);
        self.google_userinfo_url = format!("{}/oauth2/v3/userinfo", base);
        self.google_revoke_url = format!("{}/revoke", base);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = parse_var("PORT", 8080)?;
        let upstream_timeout_secs = parse_var("UPSTREAM_TIMEOUT_SECS", 30)?;
        let token_refresh_margin_secs =
            parse_var("TOKEN_REFRESH_MARGIN_SECS", DEFAULT_TOKEN_REFRESH_MARGIN_SECS)?;

        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
            .into_bytes();
        if oauth_state_key.len() < MIN_STATE_KEY_LEN {
            return Err(ConfigError::Invalid {
                name: "OAUTH_STATE_KEY",
                reason: format!("must be at least {} bytes", MIN_STATE_KEY_LEN),
            });
        }

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            oauth_redirect_url: env::var("OAUTH_REDIRECT_URL").ok(),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            kms_key_ring: env::var("KMS_KEY_RING").unwrap_or_else(|_| "calendar-sync".to_string()),
            kms_key_name: env::var("KMS_KEY_NAME")
                .unwrap_or_else(|_| "token-encryption".to_string()),
            port,
            google_api_base_url: env::var("GOOGLE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_API_BASE_URL.to_string()),
            google_auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            google_userinfo_url: env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_USERINFO_URL.to_string()),
            google_revoke_url: env::var("GOOGLE_REVOKE_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_REVOKE_URL.to_string()),
            upstream_timeout_secs,
            token_refresh_margin_secs,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            oauth_state_key,
        })
    }
}

const DEFAULT_GOOGLE_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const DEFAULT_GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const DEFAULT_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const MIN_STATE_KEY_LEN: usize = 32;

/// Parse an optional numeric env var, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("could not parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so everything touching them lives in one test.
    #[test]
    fn test_config_from_env() {
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", " test_secret \n");
        env::set_var("OAUTH_STATE_KEY", "short");
        env::remove_var("PORT");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "OAUTH_STATE_KEY",
                ..
            }
        ));

        env::set_var("OAUTH_STATE_KEY", "an_oauth_state_key_of_32_bytes!!");
        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_refresh_margin_secs, 60);

        env::set_var("UPSTREAM_TIMEOUT_SECS", "soon");
        assert!(Config::from_env().is_err());
        env::remove_var("UPSTREAM_TIMEOUT_SECS");
    }

    #[test]
    fn test_with_google_base_url() {
        let config = Config::test_default().with_google_base_url("http://127.0.0.1:9999");
        assert_eq!(
            config.google_api_base_url,
            "http://127.0.0.1:9999/calendar/v3"
        );
        assert_eq!(config.google_token_url, "http://127.0.0.1:9999/token");
    }
}
