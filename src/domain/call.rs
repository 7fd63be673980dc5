//! Call domain model
//!
//! A call is one telephony session between a caller and the platform. It is
//! created when the provider opens a media stream and mutated only to attach
//! late attribution (call SID, agent) and to close it out (status, end time,
//! duration). Everything else recorded about a call hangs off it as child
//! entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analytics::AnalyticsSnapshot;
use crate::domain::metadata::CallMetadata;
use crate::domain::recording::Recording;
use crate::domain::transcript::Transcript;

/// A single telephony session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Unique call record ID
    pub id: Uuid,

    /// Media-stream identifier assigned by the telephony provider (unique)
    pub stream_sid: String,

    /// Provider call identifier, often attributed after the stream opens
    pub call_sid: Option<String>,

    /// Caller number or handle
    pub caller: String,

    /// Agent the call was routed to
    pub agent: Option<String>,

    /// Time information
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    /// Duration in seconds
    pub duration: Option<i32>,

    /// Lifecycle status
    pub status: CallStatus,

    /// Record timestamps
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Call lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Call in progress
    Active,
    /// Call ended normally
    Completed,
    /// Call never connected or errored out
    Failed,
    /// Connection lost mid-call
    Dropped,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Active => "active",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Dropped => "dropped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CallStatus::Active),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            "dropped" => Some(CallStatus::Dropped),
            _ => None,
        }
    }
}

/// Fields accepted when opening a call record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallInput {
    pub stream_sid: String,
    pub call_sid: Option<String>,
    pub caller: String,
    pub agent: Option<String>,
}

/// Partial update for a call. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCallInput {
    pub call_sid: Option<String>,
    pub agent: Option<String>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub status: Option<CallStatus>,
}

impl Call {
    /// Create a call record for a newly opened media stream.
    pub fn new(input: CreateCallInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stream_sid: input.stream_sid,
            call_sid: input.call_sid,
            caller: input.caller,
            agent: input.agent,
            start_time: now,
            end_time: None,
            duration: None,
            status: CallStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into the record. `None` fields keep their
    /// current values; `updated_at` always advances.
    pub fn apply(&mut self, changes: UpdateCallInput) {
        if let Some(call_sid) = changes.call_sid {
            self.call_sid = Some(call_sid);
        }
        if let Some(agent) = changes.agent {
            self.agent = Some(agent);
        }
        if let Some(end_time) = changes.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(duration) = changes.duration {
            self.duration = Some(duration);
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == CallStatus::Active
    }
}

/// A call hydrated with everything recorded against it, the shape the
/// lookup and list operations return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallWithRelations {
    pub call: Call,
    pub recordings: Vec<Recording>,
    pub transcripts: Vec<Transcript>,
    pub analytics: Vec<AnalyticsSnapshot>,
    pub metadata: Option<CallMetadata>,
}
