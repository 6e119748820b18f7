// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! The emulator provides a clean state for each test run.

use calendar_sync::models::{
    Calendar, CalendarEvent, EventStatus, SyncStatus, GOOGLE_CALENDAR_PROVIDER,
};
use chrono::{Duration, Utc};

mod common;
use common::{mock_encrypt, test_db};

/// Generate a unique profile ID for test isolation.
fn unique_profile_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("profile/{}", nanos)
}

fn test_calendar(profile_id: &str, google_id: &str) -> Calendar {
    let now = Utc::now().to_rfc3339();
    Calendar {
        id: Calendar::local_id(profile_id, google_id),
        profile_id: profile_id.to_string(),
        google_calendar_id: google_id.to_string(),
        name: google_id.to_string(),
        description: None,
        color: Some("#9fe1e7".to_string()),
        timezone: None,
        is_primary: false,
        is_selected: true,
        access_role: Some("reader".to_string()),
        last_synced_at: None,
        sync_status: SyncStatus::Pending,
        created_at: now.clone(),
        updated_at: now,
    }
}

fn test_event(calendar: &Calendar, google_id: &str, status: EventStatus) -> CalendarEvent {
    let now = Utc::now().to_rfc3339();
    CalendarEvent {
        id: CalendarEvent::local_id(&calendar.id, google_id),
        calendar_id: calendar.id.clone(),
        profile_id: calendar.profile_id.clone(),
        google_event_id: google_id.to_string(),
        title: "Standup".to_string(),
        description: None,
        location: None,
        start_at: "2024-01-01T10:00:00-08:00".to_string(),
        end_at: "2024-01-01T10:15:00-08:00".to_string(),
        all_day: false,
        timezone: None,
        status,
        meeting_link: None,
        html_link: None,
        organizer_email: None,
        attendees: Vec::new(),
        recurring_event_id: None,
        last_synced_at: now.clone(),
        sync_status: SyncStatus::Synced,
        updated_at: now,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CREDENTIAL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_credential_upsert_overwrites() {
    require_emulator!();

    let db = test_db().await;
    let profile_id = unique_profile_id();

    let before = db
        .get_credential(&profile_id, GOOGLE_CALENDAR_PROVIDER)
        .await
        .unwrap();
    assert!(before.is_none(), "Credential should not exist before creation");

    let now = Utc::now();
    let mut credential = calendar_sync::models::Credential {
        profile_id: profile_id.clone(),
        provider: GOOGLE_CALENDAR_PROVIDER.to_string(),
        account_email: None,
        access_token_encrypted: mock_encrypt("access-1"),
        refresh_token_encrypted: mock_encrypt("refresh-1"),
        expires_at: (now + Duration::hours(1)).to_rfc3339(),
        scopes: Vec::new(),
        is_active: true,
        created_at: now.to_rfc3339(),
        updated_at: now.to_rfc3339(),
    };
    db.upsert_credential(&credential).await.unwrap();

    credential.access_token_encrypted = mock_encrypt("access-2");
    db.upsert_credential(&credential).await.unwrap();

    let stored = db
        .get_credential(&profile_id, GOOGLE_CALENDAR_PROVIDER)
        .await
        .unwrap()
        .expect("Credential should exist");
    assert_eq!(stored.access_token_encrypted, mock_encrypt("access-2"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CALENDAR AND EVENT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_calendar_batch_upsert_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let profile_id = unique_profile_id();
    let calendars = vec![
        test_calendar(&profile_id, "primary"),
        test_calendar(&profile_id, "team@group.calendar.google.com"),
    ];

    db.upsert_calendars(&calendars).await.unwrap();
    db.upsert_calendars(&calendars).await.unwrap();

    let stored = db.list_calendars(&profile_id).await.unwrap();
    assert_eq!(stored.len(), 2);

    let other = db.list_calendars(&unique_profile_id()).await.unwrap();
    assert!(other.is_empty(), "Listing is scoped to the profile");
}

#[tokio::test]
async fn test_event_upsert_updates_in_place() {
    require_emulator!();

    let db = test_db().await;
    let profile_id = unique_profile_id();
    let calendar = test_calendar(&profile_id, "primary");
    db.upsert_calendars(std::slice::from_ref(&calendar))
        .await
        .unwrap();

    db.upsert_events(&[test_event(&calendar, "e1", EventStatus::Confirmed)])
        .await
        .unwrap();
    db.upsert_events(&[test_event(&calendar, "e1", EventStatus::Cancelled)])
        .await
        .unwrap();

    let events = db.list_events(&calendar.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Cancelled);
}

#[tokio::test]
async fn test_large_event_batch() {
    require_emulator!();

    let db = test_db().await;
    let profile_id = unique_profile_id();
    let calendar = test_calendar(&profile_id, "primary");

    // More than one transaction's worth of writes
    let events: Vec<_> = (0..450)
        .map(|i| test_event(&calendar, &format!("e{}", i), EventStatus::Confirmed))
        .collect();
    db.upsert_events(&events).await.unwrap();

    let stored = db.list_events(&calendar.id).await.unwrap();
    assert_eq!(stored.len(), 450);
}
