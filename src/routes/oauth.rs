// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth connection routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::GOOGLE_CALENDAR_PROVIDER;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long an issued OAuth state stays valid.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Tolerated clock skew for states stamped in the future.
const STATE_CLOCK_SKEW_MS: u128 = 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth/google/authorize", post(authorize))
        .route("/oauth/google/callback", get(callback))
        .route("/oauth/google/status", get(status))
        .route("/oauth/google/disconnect", post(disconnect))
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    profile_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthorizeResponse {
    pub url: String,
}

/// Start the OAuth flow: return the Google consent URL for a profile.
async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<AuthorizeResponse>> {
    if request.profile_id.trim().is_empty() {
        return Err(AppError::BadRequest("'profile_id' is required".to_string()));
    }

    let timestamp = now_millis()?;
    let oauth_state = sign_state(&request.profile_id, timestamp, &state.config.oauth_state_key)?;
    let redirect_uri = callback_url(&state.config, &headers);

    let url = state.google.authorization_url(&redirect_uri, &oauth_state);

    tracing::info!(
        profile_id = %request.profile_id,
        redirect_uri = %redirect_uri,
        "Starting Google OAuth flow"
    );

    Ok(Json(AuthorizeResponse { url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code, store the credential, redirect back to
/// the application. Failures are reported to the frontend via `?error=`.
async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = format!("{}/calendar", state.config.frontend_url.trim_end_matches('/'));
    let fail = |reason: &str| {
        Redirect::temporary(&format!("{}?error={}", frontend, urlencoding::encode(reason)))
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return fail(&error);
    }

    let Some(profile_id) = params.state.as_deref().and_then(|s| {
        verify_state(s, &state.config.oauth_state_key, now_millis().ok()?)
    }) else {
        tracing::warn!("Invalid, expired, or tampered OAuth state parameter");
        return fail(AppError::InvalidState.code());
    };

    let Some(code) = params.code else {
        return fail("missing_code");
    };

    let redirect_uri = callback_url(&state.config, &headers);
    match connect_account(&state, &profile_id, &code, &redirect_uri).await {
        Ok(()) => Redirect::temporary(&format!("{}?google_connected=true", frontend)),
        Err(e) => {
            tracing::error!(error = %e, profile_id = %profile_id, "Google OAuth callback failed");
            fail(e.code())
        }
    }
}

/// Exchange the code and store the resulting credential.
async fn connect_account(
    state: &AppState,
    profile_id: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<()> {
    tracing::info!(profile_id, "Exchanging authorization code for tokens");
    let tokens = state.google.exchange_code(code, redirect_uri).await?;

    let email = match state.google.get_account_email(&tokens.access_token).await {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch account email, continuing anyway");
            None
        }
    };

    state
        .tokens
        .store_authorization(profile_id, &tokens, email)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct StatusParams {
    #[serde(default)]
    profile_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub account_email: Option<String>,
    pub expires_at: Option<String>,
    pub scopes: Vec<String>,
}

/// Whether a profile has an active Google connection.
async fn status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> Result<Json<ConnectionStatus>> {
    let credential = if params.profile_id.trim().is_empty() {
        None
    } else {
        state
            .db
            .get_credential(&params.profile_id, GOOGLE_CALENDAR_PROVIDER)
            .await?
            .filter(|c| c.is_active)
    };

    Ok(Json(match credential {
        Some(c) => ConnectionStatus {
            connected: true,
            account_email: c.account_email,
            expires_at: Some(c.expires_at),
            scopes: c.scopes,
        },
        None => ConnectionStatus {
            connected: false,
            account_email: None,
            expires_at: None,
            scopes: Vec::new(),
        },
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisconnectResponse {
    pub disconnected: bool,
}

/// Revoke and deactivate a profile's Google connection.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<DisconnectResponse>> {
    let disconnected = state.tokens.deactivate(&request.profile_id).await?;
    Ok(Json(DisconnectResponse { disconnected }))
}

/// Callback URL registered with Google: the configured one, or derived from
/// the request's Host header.
fn callback_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = &config.oauth_redirect_url {
        return url.clone();
    }

    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/oauth/google/callback", scheme, host)
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Build the signed state: base64url("profile_id|timestamp_hex|signature_hex").
fn sign_state(profile_id: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", profile_id, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age of an OAuth state, returning its profile id.
///
/// Fields are split from the right, so profile ids may contain `|`.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let profile_id = parts.next()?;

    let payload = format!("{}|{}", profile_id, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if issued_at > now_ms + STATE_CLOCK_SKEW_MS || now_ms.saturating_sub(issued_at) > STATE_MAX_AGE_MS
    {
        tracing::warn!(profile_id, "OAuth state expired");
        return None;
    }

    if profile_id.is_empty() {
        return None;
    }
    Some(profile_id.to_string())
}
