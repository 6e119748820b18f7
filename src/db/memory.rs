// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory storage backend used by tests.
//!
//! The server binary always connects to Firestore; for local runs point it
//! at the emulator with `FIRESTORE_EMULATOR_HOST`.
//!
//! Documents are keyed exactly like their Firestore counterparts, so upsert
//! and idempotence behave the same.

use crate::error::AppError;
use crate::models::{Calendar, CalendarEvent, Credential};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryDb {
    credentials: Arc<DashMap<String, Credential>>,
    calendars: Arc<DashMap<String, Calendar>>,
    events: Arc<DashMap<String, CalendarEvent>>,
}

impl MemoryDb {
    pub fn get_credential(
        &self,
        profile_id: &str,
        provider: &str,
    ) -> Result<Option<Credential>, AppError> {
        Ok(self
            .credentials
            .get(&Credential::doc_id(profile_id, provider))
            .map(|c| c.value().clone()))
    }

    pub fn upsert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        self.credentials.insert(
            Credential::doc_id(&credential.profile_id, &credential.provider),
            credential.clone(),
        );
        Ok(())
    }

    pub fn get_calendar(&self, calendar_id: &str) -> Result<Option<Calendar>, AppError> {
        Ok(self.calendars.get(calendar_id).map(|c| c.value().clone()))
    }

    pub fn list_calendars(&self, profile_id: &str) -> Result<Vec<Calendar>, AppError> {
        let mut calendars: Vec<Calendar> = self
            .calendars
            .iter()
            .filter(|c| c.profile_id == profile_id)
            .map(|c| c.value().clone())
            .collect();
        calendars.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(calendars)
    }

    pub fn upsert_calendars(&self, calendars: &[Calendar]) -> Result<(), AppError> {
        for calendar in calendars {
            self.calendars.insert(calendar.id.clone(), calendar.clone());
        }
        Ok(())
    }

    pub fn list_events(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, AppError> {
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|e| e.calendar_id == calendar_id)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by(|a, b| a.start_at.cmp(&b.start_at));
        Ok(events)
    }

    pub fn upsert_events(&self, events: &[CalendarEvent]) -> Result<(), AppError> {
        for event in events {
            self.events.insert(event.id.clone(), event.clone());
        }
        Ok(())
    }
}
