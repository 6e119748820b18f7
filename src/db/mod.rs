// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Db`] is the handle the rest of the crate uses. Production runs against
//! Firestore (the emulator locally); tests use the in-memory backend.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Calendar, CalendarEvent, Credential};

/// Collection names as constants.
pub mod collections {
    pub const CREDENTIALS: &str = "credentials";
    pub const CALENDARS: &str = "calendars";
    pub const CALENDAR_EVENTS: &str = "calendar_events";
}

/// Storage handle dispatching to the configured backend.
#[derive(Clone)]
pub enum Db {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Db {
    /// Connect to Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set).
    pub async fn firestore(project_id: &str) -> Result<Self, AppError> {
        Ok(Db::Firestore(FirestoreDb::new(project_id).await?))
    }

    /// Fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Db::Memory(MemoryDb::default())
    }

    /// Disconnected store; every operation fails with a database error.
    pub fn offline() -> Self {
        Db::Firestore(FirestoreDb::new_mock())
    }

    // ─── Credentials ─────────────────────────────────────────────

    pub async fn get_credential(
        &self,
        profile_id: &str,
        provider: &str,
    ) -> Result<Option<Credential>, AppError> {
        match self {
            Db::Firestore(db) => db.get_credential(profile_id, provider).await,
            Db::Memory(db) => db.get_credential(profile_id, provider),
        }
    }

    pub async fn upsert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        match self {
            Db::Firestore(db) => db.upsert_credential(credential).await,
            Db::Memory(db) => db.upsert_credential(credential),
        }
    }

    // ─── Calendars ───────────────────────────────────────────────

    pub async fn get_calendar(&self, calendar_id: &str) -> Result<Option<Calendar>, AppError> {
        match self {
            Db::Firestore(db) => db.get_calendar(calendar_id).await,
            Db::Memory(db) => db.get_calendar(calendar_id),
        }
    }

    pub async fn list_calendars(&self, profile_id: &str) -> Result<Vec<Calendar>, AppError> {
        match self {
            Db::Firestore(db) => db.list_calendars(profile_id).await,
            Db::Memory(db) => db.list_calendars(profile_id),
        }
    }

    /// Upsert calendars keyed by their local id.
    ///
    /// On Firestore each chunk of 400 rows commits atomically; an earlier
    /// chunk stays written if a later one fails.
    pub async fn upsert_calendars(&self, calendars: &[Calendar]) -> Result<(), AppError> {
        match self {
            Db::Firestore(db) => db.upsert_calendars(calendars).await,
            Db::Memory(db) => db.upsert_calendars(calendars),
        }
    }

    // ─── Events ──────────────────────────────────────────────────

    pub async fn list_events(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, AppError> {
        match self {
            Db::Firestore(db) => db.list_events(calendar_id).await,
            Db::Memory(db) => db.list_events(calendar_id),
        }
    }

    /// Upsert events keyed by their local id (atomic per 400-row chunk).
    pub async fn upsert_events(&self, events: &[CalendarEvent]) -> Result<(), AppError> {
        match self {
            Db::Firestore(db) => db.upsert_events(events).await,
            Db::Memory(db) => db.upsert_events(events),
        }
    }
}
