// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar sync endpoint.

use crate::error::{AppError, Result};
use crate::models::{Calendar, CalendarEvent};
use crate::services::EventWindow;
use crate::time_utils::parse_rfc3339_utc;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/calendar/sync", post(sync))
}

/// Sync request body.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncRequest {
    pub action: String,
    /// Empty or unknown profiles are reported as not connected (404).
    #[serde(default)]
    pub profile_id: String,
    /// Local calendar id; required for `sync_events`
    #[validate(length(min = 1, max = 256))]
    pub calendar_id: Option<String>,
    #[serde(rename = "timeMin")]
    #[validate(length(max = 64))]
    pub time_min: Option<String>,
    #[serde(rename = "timeMax")]
    #[validate(length(max = 64))]
    pub time_max: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    SyncCalendars,
    SyncEvents,
}

impl FromStr for SyncAction {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sync_calendars" => Ok(SyncAction::SyncCalendars),
            "sync_events" => Ok(SyncAction::SyncEvents),
            other => Err(AppError::BadRequest(format!("Unknown action: {}", other))),
        }
    }
}

impl SyncRequest {
    /// Event window: start defaults to now, end is unbounded unless given.
    fn window(&self) -> Result<EventWindow> {
        let parse = |name: &str, raw: &str| {
            parse_rfc3339_utc(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid '{}': must be an RFC3339 datetime", name))
            })
        };

        let time_min = match self.time_min.as_deref() {
            Some(raw) => parse("timeMin", raw)?,
            None => Utc::now(),
        };
        let time_max = self
            .time_max
            .as_deref()
            .map(|raw| parse("timeMax", raw))
            .transpose()?;

        if let Some(max) = time_max {
            if max <= time_min {
                return Err(AppError::BadRequest(
                    "'timeMax' must be after 'timeMin'".to_string(),
                ));
            }
        }

        Ok(EventWindow { time_min, time_max })
    }
}

#[derive(Serialize)]
#[serde(untagged)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncResponse {
    Calendars { calendars: Vec<Calendar> },
    Events { events: Vec<CalendarEvent> },
}

/// Run one sync action for a profile.
async fn sync(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let action: SyncAction = request.action.parse()?;

    tracing::debug!(
        profile_id = %request.profile_id,
        action = %request.action,
        calendar_id = ?request.calendar_id,
        "Sync requested"
    );

    match action {
        SyncAction::SyncCalendars => {
            let calendars = state
                .sync_service
                .sync_calendars(&request.profile_id)
                .await?;
            Ok(Json(SyncResponse::Calendars { calendars }))
        }
        SyncAction::SyncEvents => {
            let calendar_id = request.calendar_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("'calendar_id' is required for sync_events".to_string())
            })?;
            let window = request.window()?;
            let events = state
                .sync_service
                .sync_events(&request.profile_id, calendar_id, window)
                .await?;
            Ok(Json(SyncResponse::Events { events }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(time_min: Option<&str>, time_max: Option<&str>) -> SyncRequest {
        SyncRequest {
            action: "sync_events".to_string(),
            profile_id: "profile-1".to_string(),
            calendar_id: Some("cal-1".to_string()),
            time_min: time_min.map(str::to_string),
            time_max: time_max.map(str::to_string),
        }
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            "sync_calendars".parse::<SyncAction>().unwrap(),
            SyncAction::SyncCalendars
        );
        assert_eq!(
            "sync_events".parse::<SyncAction>().unwrap(),
            SyncAction::SyncEvents
        );
        assert!(matches!(
            "delete_everything".parse::<SyncAction>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_window_defaults_to_now_unbounded() {
        let before = Utc::now();
        let window = request(None, None).window().unwrap();
        assert!(window.time_min >= before);
        assert!(window.time_max.is_none());
    }

    #[test]
    fn test_window_rejects_bad_input() {
        assert!(request(Some("last tuesday"), None).window().is_err());
        assert!(request(
            Some("2024-02-01T00:00:00Z"),
            Some("2024-01-01T00:00:00Z")
        )
        .window()
        .is_err());

        let window = request(Some("2024-01-01T00:00:00Z"), Some("2024-02-01T00:00:00Z"))
            .window()
            .unwrap();
        assert!(window.time_max.is_some());
    }

    #[test]
    fn test_calendar_id_length_validated() {
        let mut req = request(None, None);
        req.calendar_id = Some(String::new());
        assert!(req.validate().is_err());
    }
}
