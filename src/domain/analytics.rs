//! Point-in-time analytics captured while a call runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One analytics observation for a call. Snapshots accumulate over the
/// life of the call and are read back in the order they were taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub id: Uuid,

    /// Owning call
    pub call_id: Uuid,

    /// Overall sentiment label ("positive", "neutral", "negative", ...)
    pub sentiment: Option<String>,

    /// Numeric sentiment, -1.0 to 1.0
    pub sentiment_score: Option<f64>,

    /// Seconds of active speech
    pub talk_time: Option<f64>,

    /// Seconds of silence
    pub silence_time: Option<f64>,

    /// Number of detected interruptions
    pub interruptions: Option<i32>,

    /// Mean response latency in seconds
    pub average_latency: Option<f64>,

    /// Free-form metrics payload
    pub metrics: Option<serde_json::Value>,

    /// When this observation was taken
    pub snapshot_time: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Fields accepted when recording an analytics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAnalyticsInput {
    pub call_id: Uuid,
    pub sentiment: Option<String>,
    pub sentiment_score: Option<f64>,
    pub talk_time: Option<f64>,
    pub silence_time: Option<f64>,
    pub interruptions: Option<i32>,
    pub average_latency: Option<f64>,
    pub metrics: Option<serde_json::Value>,
}

impl AnalyticsSnapshot {
    /// Record an observation stamped with the current time.
    pub fn new(input: CreateAnalyticsInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            call_id: input.call_id,
            sentiment: input.sentiment,
            sentiment_score: input.sentiment_score,
            talk_time: input.talk_time,
            silence_time: input.silence_time,
            interruptions: input.interruptions,
            average_latency: input.average_latency,
            metrics: input.metrics,
            snapshot_time: now,
            created_at: now,
        }
    }
}
