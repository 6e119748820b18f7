// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle for Google credentials.
//!
//! Responsible for:
//! - Loading the active credential of a profile
//! - Returning a valid access token, refreshing it when expired
//! - Persisting refreshed tokens (encrypted) before they are used
//! - Storing new credentials after the interactive OAuth leg

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Credential, GOOGLE_CALENDAR_PROVIDER};
use crate::services::google_client::{GoogleClient, TokenResponse};
use crate::services::kms::{encrypt_tokens, KmsService};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Manages the credential record's access/refresh token pair.
#[derive(Clone)]
pub struct TokenManager {
    client: GoogleClient,
    db: Db,
    kms: KmsService,
    /// Per-profile mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
    /// Tokens expiring within this margin are treated as expired.
    refresh_margin: Duration,
}

impl TokenManager {
    pub fn new(
        client: GoogleClient,
        db: Db,
        kms: KmsService,
        refresh_locks: RefreshLocks,
        refresh_margin_secs: i64,
    ) -> Self {
        Self {
            client,
            db,
            kms,
            refresh_locks,
            refresh_margin: Duration::seconds(refresh_margin_secs),
        }
    }

    /// Load the active Google credential for a profile.
    ///
    /// Missing, inactive, and empty-profile lookups all yield `NotFound`.
    pub async fn active_credential(&self, profile_id: &str) -> Result<Credential, AppError> {
        let not_connected = || {
            AppError::NotFound(format!(
                "No active Google Calendar connection for profile '{}'",
                profile_id
            ))
        };

        if profile_id.trim().is_empty() {
            return Err(not_connected());
        }

        match self
            .db
            .get_credential(profile_id, GOOGLE_CALENDAR_PROVIDER)
            .await?
        {
            Some(credential) if credential.is_active => Ok(credential),
            _ => Err(not_connected()),
        }
    }

    /// Return a valid (non-expired) access token for `credential`.
    ///
    /// If the stored token is expired, exchanges the refresh token exactly
    /// once and persists the new token before returning it. A rejected
    /// refresh aborts with `TokenRefreshRejected`; nothing is retried.
    pub async fn access_token(&self, credential: &Credential) -> Result<String, AppError> {
        let profile_id = credential.profile_id.as_str();

        if !self.is_expired(credential)? {
            return self.decrypt(&credential.access_token_encrypted, profile_id).await;
        }

        // Only one task per profile refreshes; the others wait here.
        let lock = self
            .refresh_locks
            .entry(profile_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let current = self.active_credential(profile_id).await?;
        if !self.is_expired(&current)? {
            tracing::debug!(profile_id, "Token refreshed by concurrent request");
            return self.decrypt(&current.access_token_encrypted, profile_id).await;
        }

        tracing::info!(profile_id, "Access token expired, refreshing");

        let refresh_token = self
            .decrypt(&current.refresh_token_encrypted, profile_id)
            .await?;
        let refreshed = self.client.refresh_access_token(&refresh_token).await?;

        // Google only returns a refresh token here when it rotates it.
        let new_refresh = refreshed.refresh_token.as_deref().unwrap_or(&refresh_token);
        let (enc_access, enc_refresh) =
            encrypt_tokens(&self.kms, &refreshed.access_token, new_refresh, profile_id).await?;

        let now = Utc::now();
        let updated = Credential {
            access_token_encrypted: enc_access,
            refresh_token_encrypted: enc_refresh,
            expires_at: format_utc_rfc3339(now + Duration::seconds(refreshed.expires_in)),
            updated_at: format_utc_rfc3339(now),
            ..current
        };
        self.db.upsert_credential(&updated).await?;

        tracing::info!(profile_id, expires_at = %updated.expires_at, "Token refreshed and stored");
        Ok(refreshed.access_token)
    }

    /// Store the tokens from a successful authorization code exchange.
    ///
    /// Re-authorizing an already connected profile overwrites its credential
    /// and reactivates it. When Google omits the refresh token, the stored
    /// one is kept.
    pub async fn store_authorization(
        &self,
        profile_id: &str,
        tokens: &TokenResponse,
        account_email: Option<String>,
    ) -> Result<Credential, AppError> {
        let existing = self
            .db
            .get_credential(profile_id, GOOGLE_CALENDAR_PROVIDER)
            .await?;

        let refresh_token = match (&tokens.refresh_token, &existing) {
            (Some(token), _) => token.clone(),
            (None, Some(previous)) => {
                self.decrypt(&previous.refresh_token_encrypted, profile_id)
                    .await?
            }
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Google did not return a refresh token; retry with consent".to_string(),
                ))
            }
        };

        let (enc_access, enc_refresh) =
            encrypt_tokens(&self.kms, &tokens.access_token, &refresh_token, profile_id).await?;

        let now = Utc::now();
        let credential = Credential {
            profile_id: profile_id.to_string(),
            provider: GOOGLE_CALENDAR_PROVIDER.to_string(),
            account_email: account_email
                .or_else(|| existing.as_ref().and_then(|c| c.account_email.clone())),
            access_token_encrypted: enc_access,
            refresh_token_encrypted: enc_refresh,
            expires_at: format_utc_rfc3339(now + Duration::seconds(tokens.expires_in)),
            scopes: tokens
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            is_active: true,
            created_at: existing
                .as_ref()
                .map(|c| c.created_at.clone())
                .unwrap_or_else(|| format_utc_rfc3339(now)),
            updated_at: format_utc_rfc3339(now),
        };

        self.db.upsert_credential(&credential).await?;
        tracing::info!(profile_id, "Google credential stored");
        Ok(credential)
    }

    /// Revoke the credential at Google (best effort) and mark it inactive.
    ///
    /// Returns `false` when the profile had no active credential.
    pub async fn deactivate(&self, profile_id: &str) -> Result<bool, AppError> {
        let credential = match self.active_credential(profile_id).await {
            Ok(c) => c,
            Err(AppError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        match self
            .decrypt(&credential.refresh_token_encrypted, profile_id)
            .await
        {
            Ok(refresh_token) => {
                if let Err(e) = self.client.revoke_token(&refresh_token).await {
                    tracing::warn!(error = %e, profile_id, "Google revocation failed, deactivating anyway");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, profile_id, "Failed to decrypt token (skipping revocation)");
            }
        }

        let updated = Credential {
            is_active: false,
            updated_at: format_utc_rfc3339(Utc::now()),
            ..credential
        };
        self.db.upsert_credential(&updated).await?;

        tracing::info!(profile_id, "Google credential deactivated");
        Ok(true)
    }

    fn is_expired(&self, credential: &Credential) -> Result<bool, AppError> {
        let expires_at: DateTime<Utc> =
            parse_rfc3339_utc(&credential.expires_at).ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Failed to parse credential expiry: {}",
                    credential.expires_at
                ))
            })?;
        Ok(Utc::now() + self.refresh_margin >= expires_at)
    }

    async fn decrypt(&self, ciphertext: &str, profile_id: &str) -> Result<String, AppError> {
        self.kms.decrypt(ciphertext, profile_id.as_bytes()).await
    }
}
