// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar-Sync: Google Calendar integration backend
//!
//! This crate provides the HTTP API that connects a profile's Google account
//! via OAuth and mirrors its calendars and events into local storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use error::AppError;
use services::{CalendarSyncService, GoogleClient, KmsService, RefreshLocks, TokenManager};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub google: GoogleClient,
    pub tokens: TokenManager,
    pub sync_service: CalendarSyncService,
}

impl AppState {
    /// Wire the services together from explicit dependencies.
    pub fn new(config: Config, db: Db, kms: KmsService) -> Result<Self, AppError> {
        let client = GoogleClient::new(&config)?;
        let refresh_locks = RefreshLocks::default();

        let tokens = TokenManager::new(
            client.clone(),
            db.clone(),
            kms,
            refresh_locks,
            config.token_refresh_margin_secs,
        );
        let sync_service = CalendarSyncService::new(client.clone(), db.clone(), tokens.clone());

        Ok(Self {
            config,
            db,
            google: client,
            tokens,
            sync_service,
        })
    }
}
