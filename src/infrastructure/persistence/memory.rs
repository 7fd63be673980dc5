//! In-memory implementation of CallRepository
//!
//! Backs tests and local development without a database. Enforces the same
//! contract as the PostgreSQL backend: unique stream and call SIDs, child
//! records require their call, deletes cascade.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::analytics::{AnalyticsSnapshot, CreateAnalyticsInput};
use crate::domain::call::{Call, CallWithRelations, CreateCallInput, UpdateCallInput};
use crate::domain::metadata::{CallMetadata, UpsertCallMetadataInput};
use crate::domain::recording::{CreateRecordingInput, Recording};
use crate::domain::repository::CallRepository;
use crate::domain::shared::{Result, StoreError};
use crate::domain::transcript::{CreateTranscriptInput, Transcript};

#[derive(Default)]
struct Store {
    calls: Vec<Call>,
    recordings: Vec<Recording>,
    transcripts: Vec<Transcript>,
    analytics: Vec<AnalyticsSnapshot>,
    metadata: Vec<CallMetadata>,
}

impl Store {
    fn require_call(&self, call_id: Uuid) -> Result<()> {
        if self.calls.iter().any(|c| c.id == call_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("Call not found: {}", call_id)))
        }
    }

    fn hydrate(&self, call: &Call) -> CallWithRelations {
        let mut recordings: Vec<Recording> = self
            .recordings
            .iter()
            .filter(|r| r.call_id == call.id)
            .cloned()
            .collect();
        recordings.sort_by_key(|r| r.created_at);

        let mut transcripts: Vec<Transcript> = self
            .transcripts
            .iter()
            .filter(|t| t.call_id == call.id)
            .cloned()
            .collect();
        transcripts.sort_by_key(|t| t.created_at);

        let mut analytics: Vec<AnalyticsSnapshot> = self
            .analytics
            .iter()
            .filter(|a| a.call_id == call.id)
            .cloned()
            .collect();
        analytics.sort_by_key(|a| a.snapshot_time);

        let metadata = self.metadata.iter().find(|m| m.call_id == call.id).cloned();

        CallWithRelations {
            call: call.clone(),
            recordings,
            transcripts,
            analytics,
            metadata,
        }
    }
}

pub struct InMemoryCallRepository {
    store: RwLock<Store>,
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }
}

impl Default for InMemoryCallRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn create_call(&self, input: CreateCallInput) -> Result<Call> {
        let mut store = self.store.write().await;

        if store.calls.iter().any(|c| c.stream_sid == input.stream_sid) {
            return Err(StoreError::Conflict(format!(
                "stream_sid already exists: {}",
                input.stream_sid
            )));
        }
        if let Some(ref call_sid) = input.call_sid {
            if store.calls.iter().any(|c| c.call_sid.as_ref() == Some(call_sid)) {
                return Err(StoreError::Conflict(format!(
                    "call_sid already exists: {}",
                    call_sid
                )));
            }
        }

        let call = Call::new(input);
        store.calls.push(call.clone());
        Ok(call)
    }

    async fn update_call(&self, id: Uuid, changes: UpdateCallInput) -> Result<Call> {
        let mut store = self.store.write().await;

        // A missing call is NotFound even when the new call_sid is taken
        let pos = store
            .calls
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Call not found: {}", id)))?;

        if let Some(ref call_sid) = changes.call_sid {
            if store
                .calls
                .iter()
                .any(|c| c.id != id && c.call_sid.as_ref() == Some(call_sid))
            {
                return Err(StoreError::Conflict(format!(
                    "call_sid already exists: {}",
                    call_sid
                )));
            }
        }

        let call = &mut store.calls[pos];
        call.apply(changes);
        Ok(call.clone())
    }

    async fn get_call_by_id(&self, id: Uuid) -> Result<Option<CallWithRelations>> {
        let store = self.store.read().await;
        Ok(store
            .calls
            .iter()
            .find(|c| c.id == id)
            .map(|c| store.hydrate(c)))
    }

    async fn get_call_by_stream_sid(&self, stream_sid: &str) -> Result<Option<CallWithRelations>> {
        let store = self.store.read().await;
        Ok(store
            .calls
            .iter()
            .find(|c| c.stream_sid == stream_sid)
            .map(|c| store.hydrate(c)))
    }

    async fn get_call_by_call_sid(&self, call_sid: &str) -> Result<Option<CallWithRelations>> {
        let store = self.store.read().await;
        Ok(store
            .calls
            .iter()
            .find(|c| c.call_sid.as_deref() == Some(call_sid))
            .map(|c| store.hydrate(c)))
    }

    async fn list_calls(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CallWithRelations>> {
        let store = self.store.read().await;

        let mut calls = store.calls.clone();
        calls.sort_by_key(|c| c.created_at);
        calls.reverse();

        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        Ok(calls
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|c| store.hydrate(&c))
            .collect())
    }

    async fn delete_call(&self, id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;

        if !store.calls.iter().any(|c| c.id == id) {
            return Err(StoreError::NotFound(format!("Call not found: {}", id)));
        }

        store.calls.retain(|c| c.id != id);
        store.recordings.retain(|r| r.call_id != id);
        store.transcripts.retain(|t| t.call_id != id);
        store.analytics.retain(|a| a.call_id != id);
        store.metadata.retain(|m| m.call_id != id);
        Ok(())
    }

    async fn create_recording(&self, input: CreateRecordingInput) -> Result<Recording> {
        let mut store = self.store.write().await;
        store.require_call(input.call_id)?;

        let recording = Recording::new(input);
        store.recordings.push(recording.clone());
        Ok(recording)
    }

    async fn get_recordings_by_call(&self, call_id: Uuid) -> Result<Vec<Recording>> {
        let store = self.store.read().await;
        let mut recordings: Vec<Recording> = store
            .recordings
            .iter()
            .filter(|r| r.call_id == call_id)
            .cloned()
            .collect();
        recordings.sort_by_key(|r| r.created_at);
        Ok(recordings)
    }

    async fn create_transcript(&self, input: CreateTranscriptInput) -> Result<Transcript> {
        let mut store = self.store.write().await;
        store.require_call(input.call_id)?;

        let transcript = Transcript::new(input);
        store.transcripts.push(transcript.clone());
        Ok(transcript)
    }

    async fn get_transcripts_by_call(&self, call_id: Uuid) -> Result<Vec<Transcript>> {
        let store = self.store.read().await;
        let mut transcripts: Vec<Transcript> = store
            .transcripts
            .iter()
            .filter(|t| t.call_id == call_id)
            .cloned()
            .collect();
        transcripts.sort_by_key(|t| t.created_at);
        Ok(transcripts)
    }

    async fn create_analytics(&self, input: CreateAnalyticsInput) -> Result<AnalyticsSnapshot> {
        let mut store = self.store.write().await;
        store.require_call(input.call_id)?;

        let snapshot = AnalyticsSnapshot::new(input);
        store.analytics.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn get_analytics_by_call(&self, call_id: Uuid) -> Result<Vec<AnalyticsSnapshot>> {
        let store = self.store.read().await;
        let mut analytics: Vec<AnalyticsSnapshot> = store
            .analytics
            .iter()
            .filter(|a| a.call_id == call_id)
            .cloned()
            .collect();
        analytics.sort_by_key(|a| a.snapshot_time);
        Ok(analytics)
    }

    async fn upsert_metadata(&self, input: UpsertCallMetadataInput) -> Result<CallMetadata> {
        let mut store = self.store.write().await;
        store.require_call(input.call_id)?;

        if let Some(existing) = store.metadata.iter_mut().find(|m| m.call_id == input.call_id) {
            existing.apply(input);
            return Ok(existing.clone());
        }

        let metadata = CallMetadata::new(input);
        store.metadata.push(metadata.clone());
        Ok(metadata)
    }

    async fn get_metadata_by_call(&self, call_id: Uuid) -> Result<Option<CallMetadata>> {
        let store = self.store.read().await;
        Ok(store.metadata.iter().find(|m| m.call_id == call_id).cloned())
    }
}
