//! Audio recordings captured during a call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored audio file for a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,

    /// Owning call
    pub call_id: Uuid,

    /// Local storage path of the audio file
    pub file_path: String,

    /// Public or signed URL, when one has been issued
    pub file_url: Option<String>,

    /// Container format, e.g. "wav"
    pub format: String,

    /// Audio codec, e.g. "pcm", "mulaw"
    pub codec: String,

    /// Sample rate in Hz
    pub sample_rate: i32,

    /// Channel count
    pub channels: i32,

    /// Length of the recording in seconds
    pub duration: Option<f64>,

    /// File size in bytes
    pub size_bytes: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// Fields accepted when registering a recording. Audio parameters left
/// unset fall back to the telephony capture defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordingInput {
    pub call_id: Uuid,
    pub file_path: String,
    pub file_url: Option<String>,
    pub format: Option<String>,
    pub codec: Option<String>,
    pub sample_rate: Option<i32>,
    pub channels: Option<i32>,
    pub duration: Option<f64>,
    pub size_bytes: Option<i64>,
}

impl Recording {
    /// Telephony capture defaults: 8 kHz mono PCM in a WAV container.
    pub fn new(input: CreateRecordingInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            call_id: input.call_id,
            file_path: input.file_path,
            file_url: input.file_url,
            format: input.format.unwrap_or_else(|| "wav".to_string()),
            codec: input.codec.unwrap_or_else(|| "pcm".to_string()),
            sample_rate: input.sample_rate.unwrap_or(8000),
            channels: input.channels.unwrap_or(1),
            duration: input.duration,
            size_bytes: input.size_bytes,
            created_at: Utc::now(),
        }
    }
}
