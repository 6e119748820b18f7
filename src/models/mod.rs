// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod calendar;
pub mod credential;
pub mod event;

pub use calendar::{Calendar, SyncStatus};
pub use credential::{Credential, GOOGLE_CALENDAR_PROVIDER};
pub use event::{CalendarEvent, EventAttendee, EventStatus};
