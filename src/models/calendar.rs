// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar model: local mirror of an upstream calendar list entry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Sync marker carried by mirrored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncStatus {
    /// Listed, but events have not been synced yet
    #[default]
    Pending,
    Synced,
}

/// Mirrored calendar stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Calendar {
    /// Local id (also used as document ID), see [`Calendar::local_id`]
    pub id: String,
    /// Owning profile
    pub profile_id: String,
    /// Google calendar id (external id, upsert key)
    pub google_calendar_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Background color as `#rrggbb`
    pub color: Option<String>,
    pub timezone: Option<String>,
    pub is_primary: bool,
    /// Whether the calendar is shown in the user's Google UI
    pub is_selected: bool,
    /// owner / writer / reader / freeBusyReader
    pub access_role: Option<String>,
    /// When events were last synced (RFC3339)
    pub last_synced_at: Option<String>,
    pub sync_status: SyncStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Calendar {
    /// Deterministic local id for an external calendar of a profile.
    ///
    /// Calendar ids are email-like (`team@group.calendar.google.com`), so they
    /// are hashed rather than embedded.
    pub fn local_id(profile_id: &str, google_calendar_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(profile_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(google_calendar_id.as_bytes());
        format!("cal_{}", &hex::encode(hasher.finalize())[..32])
    }
}
