//! PostgreSQL implementation of CallRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::analytics::{AnalyticsSnapshot, CreateAnalyticsInput};
use crate::domain::call::{Call, CallStatus, CallWithRelations, CreateCallInput, UpdateCallInput};
use crate::domain::metadata::{CallMetadata, UpsertCallMetadataInput};
use crate::domain::recording::{CreateRecordingInput, Recording};
use crate::domain::repository::CallRepository;
use crate::domain::shared::{Result, StoreError};
use crate::domain::transcript::{CreateTranscriptInput, Transcript};

#[derive(FromRow)]
struct CallRow {
    id: Uuid,
    stream_sid: String,
    call_sid: Option<String>,
    caller: String,
    agent: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration: Option<i32>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRow> for Call {
    fn from(r: CallRow) -> Self {
        Call {
            id: r.id,
            stream_sid: r.stream_sid,
            call_sid: r.call_sid,
            caller: r.caller,
            agent: r.agent,
            start_time: r.start_time,
            end_time: r.end_time,
            duration: r.duration,
            status: CallStatus::from_str(&r.status).unwrap_or(CallStatus::Failed),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RecordingRow {
    id: Uuid,
    call_id: Uuid,
    file_path: String,
    file_url: Option<String>,
    format: String,
    codec: String,
    sample_rate: i32,
    channels: i32,
    duration: Option<f64>,
    size_bytes: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<RecordingRow> for Recording {
    fn from(r: RecordingRow) -> Self {
        Recording {
            id: r.id,
            call_id: r.call_id,
            file_path: r.file_path,
            file_url: r.file_url,
            format: r.format,
            codec: r.codec,
            sample_rate: r.sample_rate,
            channels: r.channels,
            duration: r.duration,
            size_bytes: r.size_bytes,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct TranscriptRow {
    id: Uuid,
    call_id: Uuid,
    speaker: String,
    text: String,
    confidence: Option<f64>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<TranscriptRow> for Transcript {
    fn from(r: TranscriptRow) -> Self {
        Transcript {
            id: r.id,
            call_id: r.call_id,
            speaker: r.speaker,
            text: r.text,
            confidence: r.confidence,
            start_time: r.start_time,
            end_time: r.end_time,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnalyticsRow {
    id: Uuid,
    call_id: Uuid,
    sentiment: Option<String>,
    sentiment_score: Option<f64>,
    talk_time: Option<f64>,
    silence_time: Option<f64>,
    interruptions: Option<i32>,
    average_latency: Option<f64>,
    metrics: Option<serde_json::Value>,
    snapshot_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<AnalyticsRow> for AnalyticsSnapshot {
    fn from(r: AnalyticsRow) -> Self {
        AnalyticsSnapshot {
            id: r.id,
            call_id: r.call_id,
            sentiment: r.sentiment,
            sentiment_score: r.sentiment_score,
            talk_time: r.talk_time,
            silence_time: r.silence_time,
            interruptions: r.interruptions,
            average_latency: r.average_latency,
            metrics: r.metrics,
            snapshot_time: r.snapshot_time,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct MetadataRow {
    id: Uuid,
    call_id: Uuid,
    language: Option<String>,
    region: Option<String>,
    device_type: Option<String>,
    network_quality: Option<String>,
    custom_data: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MetadataRow> for CallMetadata {
    fn from(r: MetadataRow) -> Self {
        CallMetadata {
            id: r.id,
            call_id: r.call_id,
            language: r.language,
            region: r.region,
            device_type: r.device_type,
            network_quality: r.network_quality,
            custom_data: r.custom_data,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const CALL_COLUMNS: &str = "id, stream_sid, call_sid, caller, agent, \
     start_time, end_time, duration, status, created_at, updated_at";

/// Map constraint violations onto domain errors. Unique violations mean a
/// conflicting record exists; foreign key violations mean the referenced
/// call does not.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::Conflict(db_err.message().to_string()),
            Some("23503") => return StoreError::NotFound(db_err.message().to_string()),
            _ => {}
        }
    }
    StoreError::Database(Box::new(err))
}

pub struct PgCallRepository {
    pool: PgPool,
}

impl PgCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach all child records to a call.
    async fn hydrate(&self, call: Call) -> Result<CallWithRelations> {
        let recordings = self.get_recordings_by_call(call.id).await?;
        let transcripts = self.get_transcripts_by_call(call.id).await?;
        let analytics = self.get_analytics_by_call(call.id).await?;
        let metadata = self.get_metadata_by_call(call.id).await?;

        Ok(CallWithRelations {
            call,
            recordings,
            transcripts,
            analytics,
            metadata,
        })
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    async fn create_call(&self, input: CreateCallInput) -> Result<Call> {
        let call = Call::new(input);
        debug!("Creating call for stream_sid: {}", call.stream_sid);

        // Postgres rounds timestamps to microseconds; hand back the stored row
        let row = sqlx::query_as::<_, CallRow>(
            r#"
            INSERT INTO calls (
                id, stream_sid, call_sid, caller, agent,
                start_time, end_time, duration, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, stream_sid, call_sid, caller, agent,
                      start_time, end_time, duration, status,
                      created_at, updated_at
            "#,
        )
        .bind(call.id)
        .bind(&call.stream_sid)
        .bind(call.call_sid.as_ref())
        .bind(&call.caller)
        .bind(call.agent.as_ref())
        .bind(call.start_time)
        .bind(call.end_time)
        .bind(call.duration)
        .bind(call.status.as_str())
        .bind(call.created_at)
        .bind(call.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create call: {}", e);
            map_db_error(e)
        })?;

        let call = Call::from(row);
        debug!("Call created successfully: {}", call.id);
        Ok(call)
    }

    async fn update_call(&self, id: Uuid, changes: UpdateCallInput) -> Result<Call> {
        debug!("Updating call: {}", id);

        let row = sqlx::query_as::<_, CallRow>(
            r#"
            UPDATE calls
            SET call_sid = COALESCE($2, call_sid),
                agent = COALESCE($3, agent),
                end_time = COALESCE($4, end_time),
                duration = COALESCE($5, duration),
                status = COALESCE($6, status),
                updated_at = $7
            WHERE id = $1
            RETURNING id, stream_sid, call_sid, caller, agent,
                      start_time, end_time, duration, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.call_sid.as_ref())
        .bind(changes.agent.as_ref())
        .bind(changes.end_time)
        .bind(changes.duration)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update call: {}", e);
            map_db_error(e)
        })?;

        match row {
            Some(r) => {
                debug!("Call updated successfully: {}", id);
                Ok(Call::from(r))
            }
            None => Err(StoreError::NotFound(format!("Call not found: {}", id))),
        }
    }

    async fn get_call_by_id(&self, id: Uuid) -> Result<Option<CallWithRelations>> {
        debug!("Getting call by id: {}", id);

        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE id = $1",
            CALL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get call by id: {}", e);
            map_db_error(e)
        })?;

        match row {
            Some(r) => Ok(Some(self.hydrate(Call::from(r)).await?)),
            None => Ok(None),
        }
    }

    async fn get_call_by_stream_sid(&self, stream_sid: &str) -> Result<Option<CallWithRelations>> {
        debug!("Getting call by stream_sid: {}", stream_sid);

        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE stream_sid = $1",
            CALL_COLUMNS
        ))
        .bind(stream_sid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get call by stream_sid: {}", e);
            map_db_error(e)
        })?;

        match row {
            Some(r) => Ok(Some(self.hydrate(Call::from(r)).await?)),
            None => Ok(None),
        }
    }

    async fn get_call_by_call_sid(&self, call_sid: &str) -> Result<Option<CallWithRelations>> {
        debug!("Getting call by call_sid: {}", call_sid);

        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls WHERE call_sid = $1",
            CALL_COLUMNS
        ))
        .bind(call_sid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get call by call_sid: {}", e);
            map_db_error(e)
        })?;

        match row {
            Some(r) => Ok(Some(self.hydrate(Call::from(r)).await?)),
            None => Ok(None),
        }
    }

    async fn list_calls(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<CallWithRelations>> {
        debug!("Listing calls (limit: {:?}, offset: {:?})", limit, offset);

        // LIMIT NULL means no limit, OFFSET NULL means start at the top
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {} FROM calls ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            CALL_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list calls: {}", e);
            map_db_error(e)
        })?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        // One query per child table for the whole page
        let recording_rows = sqlx::query_as::<_, RecordingRow>(
            r#"
            SELECT id, call_id, file_path, file_url, format, codec,
                   sample_rate, channels, duration, size_bytes, created_at
            FROM recordings
            WHERE call_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list recordings: {}", e);
            map_db_error(e)
        })?;

        let transcript_rows = sqlx::query_as::<_, TranscriptRow>(
            r#"
            SELECT id, call_id, speaker, text, confidence,
                   start_time, end_time, created_at
            FROM transcripts
            WHERE call_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list transcripts: {}", e);
            map_db_error(e)
        })?;

        let analytics_rows = sqlx::query_as::<_, AnalyticsRow>(
            r#"
            SELECT id, call_id, sentiment, sentiment_score, talk_time,
                   silence_time, interruptions, average_latency, metrics,
                   snapshot_time, created_at
            FROM analytics_snapshots
            WHERE call_id = ANY($1)
            ORDER BY snapshot_time
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list analytics: {}", e);
            map_db_error(e)
        })?;

        let metadata_rows = sqlx::query_as::<_, MetadataRow>(
            r#"
            SELECT id, call_id, language, region, device_type,
                   network_quality, custom_data, created_at, updated_at
            FROM call_metadata
            WHERE call_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list metadata: {}", e);
            map_db_error(e)
        })?;

        let mut recordings_by_call: HashMap<Uuid, Vec<Recording>> = HashMap::new();
        for row in recording_rows {
            let recording = Recording::from(row);
            recordings_by_call
                .entry(recording.call_id)
                .or_default()
                .push(recording);
        }

        let mut transcripts_by_call: HashMap<Uuid, Vec<Transcript>> = HashMap::new();
        for row in transcript_rows {
            let transcript = Transcript::from(row);
            transcripts_by_call
                .entry(transcript.call_id)
                .or_default()
                .push(transcript);
        }

        let mut analytics_by_call: HashMap<Uuid, Vec<AnalyticsSnapshot>> = HashMap::new();
        for row in analytics_rows {
            let snapshot = AnalyticsSnapshot::from(row);
            analytics_by_call
                .entry(snapshot.call_id)
                .or_default()
                .push(snapshot);
        }

        let mut metadata_by_call: HashMap<Uuid, CallMetadata> = HashMap::new();
        for row in metadata_rows {
            let metadata = CallMetadata::from(row);
            metadata_by_call.insert(metadata.call_id, metadata);
        }

        let calls = rows
            .into_iter()
            .map(|row| {
                let call = Call::from(row);
                let recordings = recordings_by_call.remove(&call.id).unwrap_or_default();
                let transcripts = transcripts_by_call.remove(&call.id).unwrap_or_default();
                let analytics = analytics_by_call.remove(&call.id).unwrap_or_default();
                let metadata = metadata_by_call.remove(&call.id);
                CallWithRelations {
                    call,
                    recordings,
                    transcripts,
                    analytics,
                    metadata,
                }
            })
            .collect();

        Ok(calls)
    }

    async fn delete_call(&self, id: Uuid) -> Result<()> {
        debug!("Deleting call: {}", id);

        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete call: {}", e);
                map_db_error(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Call not found: {}", id)));
        }

        debug!("Call deleted successfully: {}", id);
        Ok(())
    }

    async fn create_recording(&self, input: CreateRecordingInput) -> Result<Recording> {
        let recording = Recording::new(input);
        debug!("Creating recording for call: {}", recording.call_id);

        let row = sqlx::query_as::<_, RecordingRow>(
            r#"
            INSERT INTO recordings (
                id, call_id, file_path, file_url, format, codec,
                sample_rate, channels, duration, size_bytes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, call_id, file_path, file_url, format, codec,
                      sample_rate, channels, duration, size_bytes, created_at
            "#,
        )
        .bind(recording.id)
        .bind(recording.call_id)
        .bind(&recording.file_path)
        .bind(recording.file_url.as_ref())
        .bind(&recording.format)
        .bind(&recording.codec)
        .bind(recording.sample_rate)
        .bind(recording.channels)
        .bind(recording.duration)
        .bind(recording.size_bytes)
        .bind(recording.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create recording: {}", e);
            map_db_error(e)
        })?;

        let recording = Recording::from(row);
        debug!("Recording created successfully: {}", recording.id);
        Ok(recording)
    }

    async fn get_recordings_by_call(&self, call_id: Uuid) -> Result<Vec<Recording>> {
        let rows = sqlx::query_as::<_, RecordingRow>(
            r#"
            SELECT id, call_id, file_path, file_url, format, codec,
                   sample_rate, channels, duration, size_bytes, created_at
            FROM recordings
            WHERE call_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(call_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get recordings: {}", e);
            map_db_error(e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_transcript(&self, input: CreateTranscriptInput) -> Result<Transcript> {
        let transcript = Transcript::new(input);
        debug!("Creating transcript for call: {}", transcript.call_id);

        let row = sqlx::query_as::<_, TranscriptRow>(
            r#"
            INSERT INTO transcripts (
                id, call_id, speaker, text, confidence,
                start_time, end_time, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, call_id, speaker, text, confidence,
                      start_time, end_time, created_at
            "#,
        )
        .bind(transcript.id)
        .bind(transcript.call_id)
        .bind(&transcript.speaker)
        .bind(&transcript.text)
        .bind(transcript.confidence)
        .bind(transcript.start_time)
        .bind(transcript.end_time)
        .bind(transcript.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create transcript: {}", e);
            map_db_error(e)
        })?;

        let transcript = Transcript::from(row);
        debug!("Transcript created successfully: {}", transcript.id);
        Ok(transcript)
    }

    async fn get_transcripts_by_call(&self, call_id: Uuid) -> Result<Vec<Transcript>> {
        let rows = sqlx::query_as::<_, TranscriptRow>(
            r#"
            SELECT id, call_id, speaker, text, confidence,
                   start_time, end_time, created_at
            FROM transcripts
            WHERE call_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(call_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get transcripts: {}", e);
            map_db_error(e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_analytics(&self, input: CreateAnalyticsInput) -> Result<AnalyticsSnapshot> {
        let snapshot = AnalyticsSnapshot::new(input);
        debug!("Creating analytics snapshot for call: {}", snapshot.call_id);

        let row = sqlx::query_as::<_, AnalyticsRow>(
            r#"
            INSERT INTO analytics_snapshots (
                id, call_id, sentiment, sentiment_score, talk_time,
                silence_time, interruptions, average_latency, metrics,
                snapshot_time, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, call_id, sentiment, sentiment_score, talk_time,
                      silence_time, interruptions, average_latency, metrics,
                      snapshot_time, created_at
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.call_id)
        .bind(snapshot.sentiment.as_ref())
        .bind(snapshot.sentiment_score)
        .bind(snapshot.talk_time)
        .bind(snapshot.silence_time)
        .bind(snapshot.interruptions)
        .bind(snapshot.average_latency)
        .bind(snapshot.metrics.as_ref())
        .bind(snapshot.snapshot_time)
        .bind(snapshot.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create analytics snapshot: {}", e);
            map_db_error(e)
        })?;

        let snapshot = AnalyticsSnapshot::from(row);
        debug!("Analytics snapshot created successfully: {}", snapshot.id);
        Ok(snapshot)
    }

    async fn get_analytics_by_call(&self, call_id: Uuid) -> Result<Vec<AnalyticsSnapshot>> {
        let rows = sqlx::query_as::<_, AnalyticsRow>(
            r#"
            SELECT id, call_id, sentiment, sentiment_score, talk_time,
                   silence_time, interruptions, average_latency, metrics,
                   snapshot_time, created_at
            FROM analytics_snapshots
            WHERE call_id = $1
            ORDER BY snapshot_time
            "#,
        )
        .bind(call_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get analytics: {}", e);
            map_db_error(e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_metadata(&self, input: UpsertCallMetadataInput) -> Result<CallMetadata> {
        debug!("Upserting metadata for call: {}", input.call_id);

        // Single round trip: insert, or merge the provided fields into the
        // existing record. Absent fields keep their stored values.
        let metadata = CallMetadata::new(input);

        let row = sqlx::query_as::<_, MetadataRow>(
            r#"
            INSERT INTO call_metadata (
                id, call_id, language, region, device_type,
                network_quality, custom_data, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (call_id)
            DO UPDATE SET
                language = COALESCE(EXCLUDED.language, call_metadata.language),
                region = COALESCE(EXCLUDED.region, call_metadata.region),
                device_type = COALESCE(EXCLUDED.device_type, call_metadata.device_type),
                network_quality = COALESCE(EXCLUDED.network_quality, call_metadata.network_quality),
                custom_data = COALESCE(EXCLUDED.custom_data, call_metadata.custom_data),
                updated_at = EXCLUDED.updated_at
            RETURNING id, call_id, language, region, device_type,
                      network_quality, custom_data, created_at, updated_at
            "#,
        )
        .bind(metadata.id)
        .bind(metadata.call_id)
        .bind(metadata.language.as_ref())
        .bind(metadata.region.as_ref())
        .bind(metadata.device_type.as_ref())
        .bind(metadata.network_quality.as_ref())
        .bind(metadata.custom_data.as_ref())
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert metadata: {}", e);
            map_db_error(e)
        })?;

        debug!("Metadata upserted successfully: {}", row.id);
        Ok(CallMetadata::from(row))
    }

    async fn get_metadata_by_call(&self, call_id: Uuid) -> Result<Option<CallMetadata>> {
        let row = sqlx::query_as::<_, MetadataRow>(
            r#"
            SELECT id, call_id, language, region, device_type,
                   network_quality, custom_data, created_at, updated_at
            FROM call_metadata
            WHERE call_id = $1
            "#,
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get metadata: {}", e);
            map_db_error(e)
        })?;

        Ok(row.map(Into::into))
    }
}
