//! Call repository trait
//!
//! The persistence port for the call domain. Callers depend on this trait,
//! backends implement it. Lookups for records that do not exist return
//! `Ok(None)`; mutations against missing records fail with
//! [`StoreError::NotFound`](crate::domain::shared::StoreError::NotFound).

use uuid::Uuid;

use crate::domain::analytics::{AnalyticsSnapshot, CreateAnalyticsInput};
use crate::domain::call::{Call, CallWithRelations, CreateCallInput, UpdateCallInput};
use crate::domain::metadata::{CallMetadata, UpsertCallMetadataInput};
use crate::domain::recording::{CreateRecordingInput, Recording};
use crate::domain::shared::Result;
use crate::domain::transcript::{CreateTranscriptInput, Transcript};

/// Persistence operations for calls and their child records.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CallRepository: Send + Sync {
    /// Create a call record for a newly opened stream
    async fn create_call(&self, input: CreateCallInput) -> Result<Call>;

    /// Apply a partial update to a call and return the updated record
    async fn update_call(&self, id: Uuid, changes: UpdateCallInput) -> Result<Call>;

    /// Get a call with all child records by its ID
    async fn get_call_by_id(&self, id: Uuid) -> Result<Option<CallWithRelations>>;

    /// Get a call with all child records by its stream SID
    async fn get_call_by_stream_sid(&self, stream_sid: &str) -> Result<Option<CallWithRelations>>;

    /// Get a call with all child records by its provider call SID
    async fn get_call_by_call_sid(&self, call_sid: &str) -> Result<Option<CallWithRelations>>;

    /// List calls newest-first with optional pagination
    async fn list_calls(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CallWithRelations>>;

    /// Delete a call and everything recorded against it
    async fn delete_call(&self, id: Uuid) -> Result<()>;

    /// Register a recording for a call
    async fn create_recording(&self, input: CreateRecordingInput) -> Result<Recording>;

    /// List a call's recordings oldest-first
    async fn get_recordings_by_call(&self, call_id: Uuid) -> Result<Vec<Recording>>;

    /// Append a transcript segment to a call
    async fn create_transcript(&self, input: CreateTranscriptInput) -> Result<Transcript>;

    /// List a call's transcript segments oldest-first
    async fn get_transcripts_by_call(&self, call_id: Uuid) -> Result<Vec<Transcript>>;

    /// Record an analytics snapshot for a call
    async fn create_analytics(&self, input: CreateAnalyticsInput) -> Result<AnalyticsSnapshot>;

    /// List a call's analytics snapshots in capture order
    async fn get_analytics_by_call(&self, call_id: Uuid) -> Result<Vec<AnalyticsSnapshot>>;

    /// Create or merge into the call's metadata record
    async fn upsert_metadata(&self, input: UpsertCallMetadataInput) -> Result<CallMetadata>;

    /// Get the call's metadata record, if one exists
    async fn get_metadata_by_call(&self, call_id: Uuid) -> Result<Option<CallMetadata>>;
}
