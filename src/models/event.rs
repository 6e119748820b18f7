// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event model: local mirror of an upstream event instance.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::calendar::SyncStatus;

/// Local event status. Upstream `cancelled` maps to `Cancelled`; every other
/// upstream status (confirmed, tentative, missing) maps to `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum EventStatus {
    Confirmed,
    Cancelled,
}

impl EventStatus {
    pub fn from_upstream(status: Option<&str>) -> Self {
        match status {
            Some("cancelled") => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// Event attendee (denormalized).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventAttendee {
    pub email: String,
    pub display_name: Option<String>,
    /// accepted / declined / tentative / needsAction
    pub response_status: Option<String>,
    pub organizer: bool,
}

/// Mirrored event stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarEvent {
    /// Local id (also used as document ID), see [`CalendarEvent::local_id`]
    pub id: String,
    /// Local calendar id
    pub calendar_id: String,
    pub profile_id: String,
    /// Google event id (external id, upsert key)
    pub google_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// RFC3339 for timed events, `YYYY-MM-DDT00:00:00` for all-day events
    pub start_at: String,
    pub end_at: String,
    pub all_day: bool,
    pub timezone: Option<String>,
    pub status: EventStatus,
    pub meeting_link: Option<String>,
    pub html_link: Option<String>,
    pub organizer_email: Option<String>,
    #[serde(default)]
    pub attendees: Vec<EventAttendee>,
    /// Parent series id for expanded recurring instances
    pub recurring_event_id: Option<String>,
    pub last_synced_at: String,
    pub sync_status: SyncStatus,
    pub updated_at: String,
}

impl CalendarEvent {
    /// Deterministic local id for an external event within a local calendar.
    pub fn local_id(calendar_id: &str, google_event_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(calendar_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(google_event_id.as_bytes());
        format!("evt_{}", &hex::encode(hasher.finalize())[..32])
    }
}
