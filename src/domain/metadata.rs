//! Per-call contextual metadata
//!
//! Unlike the other child entities a call has at most one metadata record.
//! Writers from different parts of the pipeline each contribute the fields
//! they know about, so writes merge field-by-field instead of replacing the
//! whole record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contextual attributes of a call, one record per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetadata {
    pub id: Uuid,

    /// Owning call (unique)
    pub call_id: Uuid,

    /// BCP 47 language tag, e.g. "en-US"
    pub language: Option<String>,

    /// Caller region
    pub region: Option<String>,

    /// Device class the call originated from
    pub device_type: Option<String>,

    /// Network quality label reported by the media layer
    pub network_quality: Option<String>,

    /// Free-form extension data
    pub custom_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields contributed by one metadata writer. `None` fields leave any
/// previously stored values in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertCallMetadataInput {
    pub call_id: Uuid,
    pub language: Option<String>,
    pub region: Option<String>,
    pub device_type: Option<String>,
    pub network_quality: Option<String>,
    pub custom_data: Option<serde_json::Value>,
}

impl CallMetadata {
    /// Create the first metadata record for a call.
    pub fn new(input: UpsertCallMetadataInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            call_id: input.call_id,
            language: input.language,
            region: input.region,
            device_type: input.device_type,
            network_quality: input.network_quality,
            custom_data: input.custom_data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge another writer's contribution into this record. Provided
    /// fields overwrite, absent fields keep their stored values.
    pub fn apply(&mut self, input: UpsertCallMetadataInput) {
        if let Some(language) = input.language {
            self.language = Some(language);
        }
        if let Some(region) = input.region {
            self.region = Some(region);
        }
        if let Some(device_type) = input.device_type {
            self.device_type = Some(device_type);
        }
        if let Some(network_quality) = input.network_quality {
            self.network_quality = Some(network_quality);
        }
        if let Some(custom_data) = input.custom_data {
            self.custom_data = Some(custom_data);
        }
        self.updated_at = Utc::now();
    }
}
