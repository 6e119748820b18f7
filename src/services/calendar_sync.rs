// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar and event synchronization from Google into local storage.
//!
//! Each sync runs one sequential chain: credential lookup, token check (and
//! refresh), upstream fetch, batch upsert. The first failure aborts the chain.

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Calendar, CalendarEvent, SyncStatus};
use crate::services::google_client::{EventWindow, GoogleClient};
use crate::services::mapping::{calendar_from_upstream, event_from_upstream};
use crate::services::token_manager::TokenManager;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use std::collections::HashMap;

/// Mirrors Google calendars and events for a profile.
#[derive(Clone)]
pub struct CalendarSyncService {
    client: GoogleClient,
    db: Db,
    tokens: TokenManager,
}

impl CalendarSyncService {
    pub fn new(client: GoogleClient, db: Db, tokens: TokenManager) -> Self {
        Self { client, db, tokens }
    }

    /// Mirror the profile's upstream calendar list.
    ///
    /// Rows are keyed by the external calendar id; calendars removed upstream
    /// are left untouched.
    pub async fn sync_calendars(&self, profile_id: &str) -> Result<Vec<Calendar>, AppError> {
        let credential = self.tokens.active_credential(profile_id).await?;
        let access_token = self.tokens.access_token(&credential).await?;

        let entries = self.client.list_calendars(&access_token).await?;
        let fetched = entries.len();

        let existing: HashMap<String, Calendar> = self
            .db
            .list_calendars(profile_id)
            .await?
            .into_iter()
            .map(|c| (c.google_calendar_id.clone(), c))
            .collect();

        let now = format_utc_rfc3339(Utc::now());
        let calendars: Vec<Calendar> = entries
            .into_iter()
            .filter_map(|entry| {
                let previous = entry.id.as_deref().and_then(|id| existing.get(id));
                calendar_from_upstream(profile_id, entry, previous, &now)
            })
            .collect();

        self.db.upsert_calendars(&calendars).await?;

        tracing::info!(
            profile_id,
            fetched,
            stored = calendars.len(),
            "Calendar list synced"
        );
        Ok(calendars)
    }

    /// Mirror the events of one local calendar within `window`.
    ///
    /// The calendar must exist and belong to `profile_id`. After the upsert
    /// the calendar's `last_synced_at` is stamped.
    pub async fn sync_events(
        &self,
        profile_id: &str,
        calendar_id: &str,
        window: EventWindow,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let credential = self.tokens.active_credential(profile_id).await?;

        let calendar = self
            .db
            .get_calendar(calendar_id)
            .await?
            .filter(|c| c.profile_id == profile_id && !c.google_calendar_id.is_empty())
            .ok_or_else(|| AppError::NotFound(format!("Calendar '{}'", calendar_id)))?;

        let access_token = self.tokens.access_token(&credential).await?;

        let items = self
            .client
            .list_events(&access_token, &calendar.google_calendar_id, &window)
            .await?;
        let fetched = items.len();

        let now = format_utc_rfc3339(Utc::now());
        let events: Vec<CalendarEvent> = items
            .into_iter()
            .filter_map(|item| event_from_upstream(&calendar, item, &now))
            .collect();

        self.db.upsert_events(&events).await?;

        let stamped = Calendar {
            last_synced_at: Some(now.clone()),
            sync_status: SyncStatus::Synced,
            updated_at: now,
            ..calendar
        };
        self.db.upsert_calendars(std::slice::from_ref(&stamped)).await?;

        tracing::info!(
            profile_id,
            calendar_id,
            fetched,
            stored = events.len(),
            "Events synced"
        );
        Ok(events)
    }
}
