// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use calendar_sync::config::Config;
use calendar_sync::db::Db;
use calendar_sync::models::{Calendar, Credential, SyncStatus, GOOGLE_CALENDAR_PROVIDER};
use calendar_sync::routes::create_router;
use calendar_sync::services::KmsService;
use calendar_sync::AppState;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for oneshot
use wiremock::MockServer;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// App wired to a mock Google server.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub google: MockServer,
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with_db(Db::in_memory()).await
}

/// Create a test app with the given store and a fresh mock Google server.
#[allow(dead_code)]
pub async fn spawn_app_with_db(db: Db) -> TestApp {
    let google = MockServer::start().await;
    let config = Config::test_default().with_google_base_url(&google.uri());
    let state = Arc::new(
        AppState::new(config, db, KmsService::new_mock()).expect("Failed to build app state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        google,
    }
}

/// Mock KMS ciphertext for a token.
#[allow(dead_code)]
pub fn mock_encrypt(token: &str) -> String {
    BASE64.encode(token)
}

/// Store a connected credential whose access token expires in `expires_in`.
#[allow(dead_code)]
pub async fn seed_credential(state: &AppState, profile_id: &str, expires_in: Duration) -> Credential {
    let now = Utc::now();
    let credential = Credential {
        profile_id: profile_id.to_string(),
        provider: GOOGLE_CALENDAR_PROVIDER.to_string(),
        account_email: Some("user@example.com".to_string()),
        access_token_encrypted: mock_encrypt("access-1"),
        refresh_token_encrypted: mock_encrypt("refresh-1"),
        expires_at: (now + expires_in).to_rfc3339(),
        scopes: vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        is_active: true,
        created_at: now.to_rfc3339(),
        updated_at: now.to_rfc3339(),
    };
    state
        .db
        .upsert_credential(&credential)
        .await
        .expect("Failed to seed credential");
    credential
}

/// Store a calendar row for a profile.
#[allow(dead_code)]
pub async fn seed_calendar(
    state: &AppState,
    calendar_id: &str,
    profile_id: &str,
    google_calendar_id: &str,
) -> Calendar {
    let now = Utc::now().to_rfc3339();
    let calendar = Calendar {
        id: calendar_id.to_string(),
        profile_id: profile_id.to_string(),
        google_calendar_id: google_calendar_id.to_string(),
        name: "Work".to_string(),
        description: None,
        color: None,
        timezone: Some("America/Los_Angeles".to_string()),
        is_primary: true,
        is_selected: true,
        access_role: Some("owner".to_string()),
        last_synced_at: None,
        sync_status: SyncStatus::Pending,
        created_at: now.clone(),
        updated_at: now,
    };
    state
        .db
        .upsert_calendars(std::slice::from_ref(&calendar))
        .await
        .expect("Failed to seed calendar");
    calendar
}

/// Send a request through the router.
#[allow(dead_code)]
pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

/// POST a JSON body and return status plus parsed JSON response.
#[allow(dead_code)]
pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    read_json(send(router, request).await).await
}

/// GET and return status plus parsed JSON response.
#[allow(dead_code)]
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    read_json(send(router, request).await).await
}

#[allow(dead_code)]
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
