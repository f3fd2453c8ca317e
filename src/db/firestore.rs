// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`HabitStore`].
//!
//! Provides high-level operations for:
//! - Tasks (habit definitions)
//! - Occurrences (one document per task per day)
//! - Progress events (append-only ledger)
//! - Streak states (cached recompute results)

use crate::db::{collections, HabitStore};
use crate::error::AppError;
use crate::models::{Occurrence, ProgressEvent, ProgressSums, StreakState, Task};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::FutureExt;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials; use an unauthenticated connection.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
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

        Ok(Self { client })
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = &self.client;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl HabitStore for FirestoreDb {
    // ─── Task Operations ─────────────────────────────────────────

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::TASKS)
            .obj()
            .one(task_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::TASKS)
            .document_id(&task.id)
            .object(task)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Occurrences
        let occurrences = self.list_occurrences(task_id, None, None).await?;
        let count = occurrences.len();
        self.batch_delete(&occurrences, collections::OCCURRENCES, |occ: &Occurrence| {
            Occurrence::document_id(&occ.task_id, occ.occurred_on)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(task_id, count, "Deleted occurrences");

        // 2. Streak state
        if self.get_streak_state(task_id).await?.is_some() {
            self.client
                .fluent()
                .delete()
                .from(collections::STREAK_STATES)
                .document_id(task_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            deleted_count += 1;
        }

        // 3. Task definition
        if self.get_task(task_id).await?.is_some() {
            self.client
                .fluent()
                .delete()
                .from(collections::TASKS)
                .document_id(task_id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            deleted_count += 1;
        }

        tracing::info!(task_id, deleted_count, "Task deletion complete");
        Ok(deleted_count)
    }

    async fn list_tasks_by_user(&self, user_id: u64) -> Result<Vec<Task>, AppError> {
        let mut tasks: Vec<Task> = self
            .client
            .fluent()
            .select()
            .from(collections::TASKS)
            .filter(|q| q.for_all([q.field("owner_user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tasks.sort_by(Task::display_order);
        Ok(tasks)
    }

    // ─── Occurrence Operations ───────────────────────────────────

    async fn insert_occurrence_if_absent(
        &self,
        task_id: &str,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let occurrence = Occurrence::pending(task_id, date);

        // `insert` fails with a conflict if the document exists; that is the
        // idempotent no-op path, not an error.
        let result: Result<Occurrence, _> = self
            .client
            .fluent()
            .insert()
            .into(collections::OCCURRENCES)
            .document_id(Occurrence::document_id(task_id, date))
            .object(&occurrence)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::trace!(task_id, %date, "Occurrence exists (idempotent skip)");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn upsert_completion(
        &self,
        task_id: &str,
        date: NaiveDate,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        seconds_logged: Option<u64>,
    ) -> Result<Occurrence, AppError> {
        let doc_id = Occurrence::document_id(task_id, date);
        let task_id = task_id.to_string();

        // Reads through `db` carry the transaction id, so a concurrent writer
        // forces a retry instead of a lost update.
        self.client
            .run_transaction(move |db, transaction| {
                let doc_id = doc_id.clone();
                let task_id = task_id.clone();

                async move {
                    let mut occurrence = db
                        .fluent()
                        .select()
                        .by_id_in(collections::OCCURRENCES)
                        .obj::<Occurrence>()
                        .one(&doc_id)
                        .await?
                        .unwrap_or_else(|| Occurrence::pending(&task_id, date));

                    // seconds_logged never regresses
                    occurrence.apply_completion(completed, completed_at, seconds_logged);

                    db.fluent()
                        .update()
                        .in_col(collections::OCCURRENCES)
                        .document_id(&doc_id)
                        .object(&occurrence)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(occurrence)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Completion transaction failed: {}", e)))
    }

    async fn list_occurrences(
        &self,
        task_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Occurrence>, AppError> {
        // Dates are stored as YYYY-MM-DD strings, which sort chronologically.
        let task_id = task_id.to_string();
        let from = from.map(|d| d.format("%Y-%m-%d").to_string());
        let to = to.map(|d| d.format("%Y-%m-%d").to_string());

        self.client
            .fluent()
            .select()
            .from(collections::OCCURRENCES)
            .filter(move |q| {
                q.for_all([
                    q.field("task_id").eq(task_id.clone()),
                    from.clone()
                        .and_then(|f| q.field("occurred_on").greater_than_or_equal(f)),
                    to.clone()
                        .and_then(|t| q.field("occurred_on").less_than_or_equal(t)),
                ])
            })
            .order_by([("occurred_on", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Progress Ledger Operations ──────────────────────────────

    async fn append_progress(&self, event: &ProgressEvent) -> Result<(), AppError> {
        let _: ProgressEvent = self
            .client
            .fluent()
            .insert()
            .into(collections::PROGRESS_EVENTS)
            .document_id(&event.id)
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProgressEvent>, AppError> {
        let task_id = task_id.to_string();
        let start_ms = start.timestamp_millis();
        let end_ms = end.timestamp_millis();

        self.client
            .fluent()
            .select()
            .from(collections::PROGRESS_EVENTS)
            .filter(move |q| {
                q.for_all([
                    q.field("task_id").eq(task_id.clone()),
                    q.field("user_id").eq(user_id),
                    q.field("at").greater_than_or_equal(start_ms),
                    q.field("at").less_than(end_ms),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn sum_progress(
        &self,
        task_id: &str,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ProgressSums, AppError> {
        let events = self.list_progress(task_id, user_id, start, end).await?;

        let mut sums = ProgressSums::default();
        for event in &events {
            sums.add(event.kind, event.value);
        }
        Ok(sums)
    }

    async fn earliest_progress_timestamp(
        &self,
        task_id: &str,
        user_id: u64,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let task_id = task_id.to_string();

        let first: Vec<ProgressEvent> = self
            .client
            .fluent()
            .select()
            .from(collections::PROGRESS_EVENTS)
            .filter(move |q| {
                q.for_all([
                    q.field("task_id").eq(task_id.clone()),
                    q.field("user_id").eq(user_id),
                ])
            })
            .order_by([("at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(first.into_iter().next().map(|e| e.at))
    }

    // ─── Streak State Operations ─────────────────────────────────

    async fn get_streak_state(&self, task_id: &str) -> Result<Option<StreakState>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::STREAK_STATES)
            .obj()
            .one(task_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_streak_state(
        &self,
        task_id: &str,
        current: u32,
        best: u32,
        last_done_day: Option<NaiveDate>,
    ) -> Result<StreakState, AppError> {
        let now = format_utc_rfc3339(Utc::now());
        let id = task_id.to_string();

        // Read-modify-write inside the transaction so the stored best never regresses.
        let state = self
            .client
            .run_transaction(move |db, transaction| {
                let id = id.clone();
                let now = now.clone();

                async move {
                    let mut state = db
                        .fluent()
                        .select()
                        .by_id_in(collections::STREAK_STATES)
                        .obj::<StreakState>()
                        .one(&id)
                        .await?
                        .unwrap_or_else(|| StreakState::empty(&id));
                    state.merge(current, best, last_done_day, &now);

                    db.fluent()
                        .update()
                        .in_col(collections::STREAK_STATES)
                        .document_id(&id)
                        .object(&state)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(state)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Streak state transaction failed: {}", e)))?;

        tracing::debug!(
            task_id,
            current = state.current_streak,
            best = state.best_streak,
            "Streak state stored"
        );

        Ok(state)
    }
}
