//! Transcript segments produced by speech recognition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recognized utterance within a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,

    /// Owning call
    pub call_id: Uuid,

    /// Who spoke, as labelled by the recognizer ("caller", "agent", ...)
    pub speaker: String,

    /// Recognized text
    pub text: String,

    /// Recognizer confidence, 0.0 to 1.0
    pub confidence: Option<f64>,

    /// Segment boundaries as seconds from call start
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,

    pub created_at: DateTime<Utc>,
}

/// Fields accepted when appending a transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTranscriptInput {
    pub call_id: Uuid,
    pub speaker: String,
    pub text: String,
    pub confidence: Option<f64>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl Transcript {
    pub fn new(input: CreateTranscriptInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            call_id: input.call_id,
            speaker: input.speaker,
            text: input.text,
            confidence: input.confidence,
            start_time: input.start_time,
            end_time: input.end_time,
            created_at: Utc::now(),
        }
    }
}
