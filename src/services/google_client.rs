// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and Calendar API client.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Access token refresh
//! - Calendar list and event listing (paginated)
//! - Boundary validation of upstream payloads
//!
//! Every call runs under the client-wide timeout; timeouts and connection
//! failures surface as [`AppError::UpstreamUnreachable`].

use crate::config::Config;
use crate::error::AppError;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Page size requested from list endpoints (Google's maximum for both).
const PAGE_SIZE: u32 = 250;

/// Upper bound on pages followed for a single list call.
pub const MAX_PAGES: usize = 25;

/// Scopes requested during authorization.
pub const GOOGLE_CALENDAR_SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Time range for an event listing. `time_max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub time_min: DateTime<Utc>,
    pub time_max: Option<DateTime<Utc>>,
}

/// Google API client.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    api_base_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    revoke_url: String,
}

impl GoogleClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            api_base_url: config.google_api_base_url.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            userinfo_url: config.google_userinfo_url.clone(),
            revoke_url: config.google_revoke_url.clone(),
        })
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Consent page URL. `access_type=offline` and `prompt=consent` make Google
    /// issue a refresh token on every authorization.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             prompt=consent&\
             include_granted_scopes=true&\
             state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&GOOGLE_CALENDAR_SCOPES.join(" ")),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| unreachable_error("Token exchange", e))?;

        self.check_response_json(response).await
    }

    /// Refresh an expired access token.
    ///
    /// Any error body from the token endpoint (typically `invalid_grant` after
    /// the user revoked access) becomes [`AppError::TokenRefreshRejected`].
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| unreachable_error("Token refresh", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TokenRefreshRejected(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| parse_error("token refresh", e))
    }

    /// Email of the authorized account, if the userinfo endpoint provides one.
    pub async fn get_account_email(&self, access_token: &str) -> Result<Option<String>, AppError> {
        let info: UserInfo = self.get_json(&self.userinfo_url, access_token, &[]).await?;
        Ok(info.email)
    }

    /// Revoke a token at Google. Revoking a refresh token also revokes the
    /// access tokens derived from it.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| unreachable_error("Token revocation", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::GoogleApi {
            status: status.as_u16(),
            body: parse_body(&body),
        })
    }

    // ─── Calendar API ────────────────────────────────────────────────────────

    /// List the user's calendars, following pagination.
    pub async fn list_calendars(
        &self,
        access_token: &str,
    ) -> Result<Vec<GoogleCalendarListEntry>, AppError> {
        let url = format!("{}/users/me/calendarList", self.api_base_url);
        self.list_paginated(&url, access_token, Vec::new()).await
    }

    /// List event instances in `window` with recurring events expanded.
    pub async fn list_events(
        &self,
        access_token: &str,
        google_calendar_id: &str,
        window: &EventWindow,
    ) -> Result<Vec<GoogleEvent>, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base_url,
            urlencoding::encode(google_calendar_id)
        );

        let mut query = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeMin", format_utc_rfc3339(window.time_min)),
        ];
        if let Some(time_max) = window.time_max {
            query.push(("timeMax", format_utc_rfc3339(time_max)));
        }

        self.list_paginated(&url, access_token, query).await
    }

    /// Collect `items` across pages until `nextPageToken` runs out.
    async fn list_paginated<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        mut query: Vec<(&'static str, String)>,
    ) -> Result<Vec<T>, AppError> {
        query.push(("maxResults", PAGE_SIZE.to_string()));

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let mut page_query = query.clone();
            if let Some(token) = page_token.take() {
                page_query.push(("pageToken", token));
            }

            let page: ListPage = self.get_json(url, access_token, &page_query).await?;
            for raw in page.items {
                match serde_json::from_value::<T>(raw) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        tracing::warn!(url, error = %e, "Skipping malformed upstream item");
                    }
                }
            }

            match page.next_page_token {
                Some(token) if page_number < MAX_PAGES => page_token = Some(token),
                Some(_) => {
                    tracing::warn!(
                        url,
                        pages = MAX_PAGES,
                        "Page limit reached, remaining upstream items not synced"
                    );
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| unreachable_error("Google API request", e))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                tracing::warn!("Google rate limit hit (429)");
            }
            return Err(AppError::GoogleApi {
                status: status.as_u16(),
                body: parse_body(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| parse_error("Google API", e))
    }
}

fn unreachable_error(what: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamUnreachable(format!("{} timed out", what))
    } else {
        AppError::UpstreamUnreachable(format!("{} failed: {}", what, e))
    }
}

fn parse_error(what: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        return AppError::UpstreamUnreachable(format!("{} response timed out", what));
    }
    AppError::Internal(anyhow::anyhow!("Failed to parse {} response: {}", what, e))
}

/// Upstream error bodies are JSON in practice; keep anything else as a string.
fn parse_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Token endpoint response (code exchange and refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Present on code exchange; only present on refresh when Google rotates it
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

/// Items stay raw so one malformed entry cannot fail the whole page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

/// Entry of `users/me/calendarList`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCalendarListEntry {
    #[validate(required, length(min = 1, max = 1024))]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    /// Name the user gave the calendar in their own list
    pub summary_override: Option<String>,
    pub description: Option<String>,
    pub time_zone: Option<String>,
    pub background_color: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub selected: bool,
    pub access_role: Option<String>,
}

/// Event instance of `calendars/{id}/events`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[validate(required, length(min = 1, max = 1024))]
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub html_link: Option<String>,
    pub hangout_link: Option<String>,
    #[validate(required)]
    pub start: Option<GoogleEventTime>,
    #[validate(required)]
    pub end: Option<GoogleEventTime>,
    pub organizer: Option<GoogleOrganizer>,
    #[serde(default)]
    pub attendees: Vec<GoogleAttendee>,
    pub conference_data: Option<GoogleConferenceData>,
    pub recurring_event_id: Option<String>,
}

/// Start or end of an event: `date` for all-day events, `dateTime` otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleOrganizer {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAttendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub response_status: Option<String>,
    #[serde(default)]
    pub organizer: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleConferenceData {
    #[serde(default)]
    pub entry_points: Vec<GoogleEntryPoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEntryPoint {
    pub entry_point_type: Option<String>,
    pub uri: Option<String>,
}
