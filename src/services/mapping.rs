// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapping of validated Google payloads onto local rows.

use crate::models::{Calendar, CalendarEvent, EventAttendee, EventStatus, SyncStatus};
use crate::services::google_client::{GoogleCalendarListEntry, GoogleEvent, GoogleEventTime};
use crate::time_utils::{date_to_local_midnight, parse_rfc3339_utc};
use validator::Validate;

/// Title used when the upstream event has none.
pub const DEFAULT_EVENT_TITLE: &str = "Untitled Event";

/// Map a calendar list entry to a local calendar row.
///
/// Local-only fields (`created_at`, `last_synced_at`, `sync_status`) are
/// carried over from `existing`. Returns `None` for entries failing validation.
pub fn calendar_from_upstream(
    profile_id: &str,
    entry: GoogleCalendarListEntry,
    existing: Option<&Calendar>,
    now: &str,
) -> Option<Calendar> {
    if let Err(e) = entry.validate() {
        tracing::warn!(error = %e, "Skipping invalid calendar list entry");
        return None;
    }
    let google_calendar_id = entry.id?;

    let name = entry
        .summary_override
        .filter(|s| !s.trim().is_empty())
        .or_else(|| Some(entry.summary).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| google_calendar_id.clone());

    Some(Calendar {
        id: Calendar::local_id(profile_id, &google_calendar_id),
        profile_id: profile_id.to_string(),
        google_calendar_id,
        name,
        description: entry.description,
        color: entry.background_color,
        timezone: entry.time_zone,
        is_primary: entry.primary,
        is_selected: entry.selected,
        access_role: entry.access_role,
        last_synced_at: existing.and_then(|c| c.last_synced_at.clone()),
        sync_status: existing.map(|c| c.sync_status).unwrap_or_default(),
        created_at: existing
            .map(|c| c.created_at.clone())
            .unwrap_or_else(|| now.to_string()),
        updated_at: now.to_string(),
    })
}

/// Map an upstream event instance to a local event row of `calendar`.
///
/// Returns `None` for events failing validation or with unparseable times.
pub fn event_from_upstream(
    calendar: &Calendar,
    item: GoogleEvent,
    now: &str,
) -> Option<CalendarEvent> {
    if let Err(e) = item.validate() {
        tracing::warn!(error = %e, calendar_id = %calendar.id, "Skipping invalid event");
        return None;
    }
    let google_event_id = item.id?;
    let start = item.start?;
    let end = item.end?;

    let (Some(start_at), Some(end_at)) = (local_time(&start), local_time(&end)) else {
        tracing::warn!(
            google_event_id = %google_event_id,
            "Skipping event with unparseable start/end"
        );
        return None;
    };

    let all_day = start.date_time.is_none() && start.date.is_some();

    let meeting_link = item.hangout_link.or_else(|| {
        item.conference_data
            .and_then(|cd| cd.entry_points.into_iter().find_map(|ep| ep.uri))
    });

    let attendees = item
        .attendees
        .into_iter()
        .filter_map(|a| {
            Some(EventAttendee {
                email: a.email?,
                display_name: a.display_name,
                response_status: a.response_status,
                organizer: a.organizer,
            })
        })
        .collect();

    Some(CalendarEvent {
        id: CalendarEvent::local_id(&calendar.id, &google_event_id),
        calendar_id: calendar.id.clone(),
        profile_id: calendar.profile_id.clone(),
        google_event_id,
        title: item
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
        description: item.description,
        location: item.location,
        start_at,
        end_at,
        all_day,
        timezone: start.time_zone.or_else(|| calendar.timezone.clone()),
        status: EventStatus::from_upstream(item.status.as_deref()),
        meeting_link,
        html_link: item.html_link,
        organizer_email: item.organizer.and_then(|o| o.email),
        attendees,
        recurring_event_id: item.recurring_event_id,
        last_synced_at: now.to_string(),
        sync_status: SyncStatus::Synced,
        updated_at: now.to_string(),
    })
}

/// `dateTime` values are kept verbatim; date-only values become local midnight.
fn local_time(time: &GoogleEventTime) -> Option<String> {
    match (&time.date_time, &time.date) {
        (Some(date_time), _) => parse_rfc3339_utc(date_time).map(|_| date_time.clone()),
        (None, Some(date)) => date_to_local_midnight(date),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2024-01-01T12:00:00Z";

    fn calendar() -> Calendar {
        calendar_from_upstream(
            "profile-1",
            serde_json::from_value(json!({
                "id": "work@example.com",
                "summary": "Work",
                "timeZone": "America/Los_Angeles",
                "backgroundColor": "#9fe1e7",
                "selected": true
            }))
            .unwrap(),
            None,
            NOW,
        )
        .unwrap()
    }

    fn event(value: serde_json::Value) -> Option<CalendarEvent> {
        event_from_upstream(&calendar(), serde_json::from_value(value).unwrap(), NOW)
    }

    #[test]
    fn test_all_day_event() {
        let row = event(json!({
            "id": "e1",
            "summary": "Holiday",
            "start": {"date": "2024-01-01"},
            "end": {"date": "2024-01-02"},
            "status": "confirmed"
        }))
        .unwrap();

        assert!(row.all_day);
        assert_eq!(row.start_at, "2024-01-01T00:00:00");
        assert_eq!(row.end_at, "2024-01-02T00:00:00");
        assert_eq!(row.status, EventStatus::Confirmed);
        assert_eq!(row.title, "Holiday");
        assert_eq!(row.timezone.as_deref(), Some("America/Los_Angeles"));
    }

    #[test]
    fn test_timed_event_keeps_offset() {
        let row = event(json!({
            "id": "e2",
            "start": {"dateTime": "2024-01-01T10:00:00-08:00", "timeZone": "America/Los_Angeles"},
            "end": {"dateTime": "2024-01-01T11:00:00-08:00"}
        }))
        .unwrap();

        assert!(!row.all_day);
        assert_eq!(row.start_at, "2024-01-01T10:00:00-08:00");
        assert_eq!(row.title, DEFAULT_EVENT_TITLE);
    }

    #[test]
    fn test_cancelled_status() {
        let row = event(json!({
            "id": "e3",
            "status": "cancelled",
            "start": {"dateTime": "2024-01-01T10:00:00Z"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"}
        }))
        .unwrap();
        assert_eq!(row.status, EventStatus::Cancelled);

        let tentative = event(json!({
            "id": "e4",
            "status": "tentative",
            "start": {"dateTime": "2024-01-01T10:00:00Z"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"}
        }))
        .unwrap();
        assert_eq!(tentative.status, EventStatus::Confirmed);
    }

    #[test]
    fn test_meeting_link_sources() {
        let direct = event(json!({
            "id": "e5",
            "hangoutLink": "https://meet.google.com/abc-defg-hij",
            "start": {"dateTime": "2024-01-01T10:00:00Z"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"},
            "conferenceData": {"entryPoints": [{"entryPointType": "video", "uri": "https://zoom.us/j/1"}]}
        }))
        .unwrap();
        assert_eq!(
            direct.meeting_link.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );

        let conference = event(json!({
            "id": "e6",
            "start": {"dateTime": "2024-01-01T10:00:00Z"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"},
            "conferenceData": {"entryPoints": [
                {"entryPointType": "more"},
                {"entryPointType": "video", "uri": "https://zoom.us/j/1"},
                {"entryPointType": "phone", "uri": "tel:+1-555-0100"}
            ]}
        }))
        .unwrap();
        assert_eq!(conference.meeting_link.as_deref(), Some("https://zoom.us/j/1"));
    }

    #[test]
    fn test_invalid_events_are_skipped() {
        assert!(event(json!({"id": "e7", "end": {"date": "2024-01-02"}})).is_none());
        assert!(event(json!({
            "id": "e8",
            "start": {"dateTime": "tomorrow at noon"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"}
        }))
        .is_none());
        assert!(event(json!({
            "start": {"date": "2024-01-01"},
            "end": {"date": "2024-01-02"}
        }))
        .is_none());
    }

    #[test]
    fn test_attendees_without_email_dropped() {
        let row = event(json!({
            "id": "e9",
            "start": {"dateTime": "2024-01-01T10:00:00Z"},
            "end": {"dateTime": "2024-01-01T11:00:00Z"},
            "organizer": {"email": "boss@example.com"},
            "attendees": [
                {"email": "a@example.com", "responseStatus": "accepted", "organizer": true},
                {"displayName": "Room 4"}
            ]
        }))
        .unwrap();

        assert_eq!(row.attendees.len(), 1);
        assert!(row.attendees[0].organizer);
        assert_eq!(row.organizer_email.as_deref(), Some("boss@example.com"));
    }

    #[test]
    fn test_calendar_preserves_local_fields() {
        let mut existing = calendar();
        existing.created_at = "2023-06-01T00:00:00Z".to_string();
        existing.last_synced_at = Some("2023-12-31T00:00:00Z".to_string());
        existing.sync_status = SyncStatus::Synced;

        let updated = calendar_from_upstream(
            "profile-1",
            serde_json::from_value(json!({
                "id": "work@example.com",
                "summary": "Work",
                "summaryOverride": "Day job",
                "primary": true
            }))
            .unwrap(),
            Some(&existing),
            "2024-02-01T00:00:00Z",
        )
        .unwrap();

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.name, "Day job");
        assert_eq!(updated.created_at, "2023-06-01T00:00:00Z");
        assert_eq!(updated.last_synced_at, existing.last_synced_at);
        assert_eq!(updated.sync_status, SyncStatus::Synced);
        assert_eq!(updated.updated_at, "2024-02-01T00:00:00Z");
        assert!(updated.is_primary);
    }

    #[test]
    fn test_calendar_name_falls_back_to_id() {
        let row = calendar_from_upstream(
            "profile-1",
            serde_json::from_value(json!({"id": "abc123@group.calendar.google.com"})).unwrap(),
            None,
            NOW,
        )
        .unwrap();
        assert_eq!(row.name, "abc123@group.calendar.google.com");
        assert_eq!(row.sync_status, SyncStatus::Pending);
    }
}
