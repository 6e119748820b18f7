// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Credentials (encrypted OAuth tokens, one per profile and provider)
//! - Calendars (mirrored calendar list entries)
//! - Calendar events (mirrored event instances)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Calendar, CalendarEvent, Credential};
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Credential Operations ───────────────────────────────────

    pub async fn get_credential(
        &self,
        profile_id: &str,
        provider: &str,
    ) -> Result<Option<Credential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(&Credential::doc_id(profile_id, provider))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(Credential::doc_id(
                &credential.profile_id,
                &credential.provider,
            ))
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Calendar Operations ─────────────────────────────────────

    pub async fn get_calendar(&self, calendar_id: &str) -> Result<Option<Calendar>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CALENDARS)
            .obj()
            .one(calendar_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_calendars(&self, profile_id: &str) -> Result<Vec<Calendar>, AppError> {
        let profile_id = profile_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CALENDARS)
            .filter(move |q| q.for_all([q.field("profile_id").eq(profile_id.clone())]))
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_calendars(&self, calendars: &[Calendar]) -> Result<(), AppError> {
        self.batch_upsert(calendars, collections::CALENDARS, |c: &Calendar| {
            c.id.clone()
        })
        .await
    }

    // ─── Event Operations ────────────────────────────────────────

    pub async fn list_events(&self, calendar_id: &str) -> Result<Vec<CalendarEvent>, AppError> {
        let calendar_id = calendar_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CALENDAR_EVENTS)
            .filter(move |q| q.for_all([q.field("calendar_id").eq(calendar_id.clone())]))
            .order_by([("start_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_events(&self, events: &[CalendarEvent]) -> Result<(), AppError> {
        self.batch_upsert(events, collections::CALENDAR_EVENTS, |e: &CalendarEvent| {
            e.id.clone()
        })
        .await
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Write documents in transactions of at most `BATCH_SIZE`.
    ///
    /// Each chunk commits atomically; a failed chunk aborts the remaining ones.
    async fn batch_upsert<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(&doc_id)
                    .object(item)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add upsert to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch upsert: {}", e))
            })?;
        }

        tracing::debug!(collection, count = items.len(), "Batch upsert committed");
        Ok(())
    }
}
