// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod calendar_sync;
pub mod google_client;
pub mod kms;
pub mod mapping;
pub mod token_manager;

pub use calendar_sync::CalendarSyncService;
pub use google_client::{EventWindow, GoogleClient};
pub use kms::KmsService;
pub use token_manager::{RefreshLocks, TokenManager};
