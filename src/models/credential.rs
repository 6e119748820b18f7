// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth credential model for storage.

use serde::{Deserialize, Serialize};

/// Provider key for Google Calendar credentials.
pub const GOOGLE_CALENDAR_PROVIDER: &str = "google_calendar";

/// A profile's OAuth credential for one upstream provider (tokens encrypted).
///
/// Stored under a document id derived from `(profile_id, provider)`, so there
/// is at most one credential per pair and every write is an upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Owning application profile
    pub profile_id: String,
    /// Provider key, e.g. `google_calendar`
    pub provider: String,
    /// Upstream account email (may be None if userinfo was unavailable)
    pub account_email: Option<String>,
    /// Encrypted access token (base64)
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64)
    pub refresh_token_encrypted: String,
    /// When the access token expires (RFC3339)
    pub expires_at: String,
    /// Granted OAuth scopes
    pub scopes: Vec<String>,
    /// Inactive credentials are treated as missing
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Credential {
    /// Document id for a `(profile_id, provider)` pair.
    pub fn doc_id(profile_id: &str, provider: &str) -> String {
        format!("{}_{}", urlencoding::encode(profile_id), provider)
    }
}
