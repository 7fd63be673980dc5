//! Call Repository Contract Tests
//!
//! Exercises the in-memory backend. These run without a database and pin
//! the behavior both backends share.

use callstore::domain::analytics::CreateAnalyticsInput;
use callstore::domain::call::{CallStatus, CreateCallInput, UpdateCallInput};
use callstore::domain::metadata::UpsertCallMetadataInput;
use callstore::domain::recording::CreateRecordingInput;
use callstore::domain::repository::CallRepository;
use callstore::domain::shared::StoreError;
use callstore::domain::transcript::CreateTranscriptInput;
use callstore::infrastructure::persistence::InMemoryCallRepository;
use chrono::Utc;
use uuid::Uuid;

#[tokio::test]
async fn test_create_call_persists_expected_shape() {
    let repo = InMemoryCallRepository::new();

    let call = repo
        .create_call(call_input("MZ100"))
        .await
        .expect("Failed to create call");

    assert_eq!(call.stream_sid, "MZ100");
    assert_eq!(call.caller, "+15550100");
    assert_eq!(call.status, CallStatus::Active);
    assert!(call.call_sid.is_none());
    assert!(call.end_time.is_none());
    assert!(call.duration.is_none());
    assert_eq!(call.start_time, call.created_at);
}

#[tokio::test]
async fn test_create_call_with_optional_fields() {
    let repo = InMemoryCallRepository::new();

    let call = repo
        .create_call(CreateCallInput {
            stream_sid: "MZ101".to_string(),
            call_sid: Some("CA101".to_string()),
            caller: "+15550100".to_string(),
            agent: Some("Dana".to_string()),
        })
        .await
        .expect("Failed to create call");

    assert_eq!(call.call_sid.as_deref(), Some("CA101"));
    assert_eq!(call.agent.as_deref(), Some("Dana"));
}

#[tokio::test]
async fn test_duplicate_stream_sid_conflicts() {
    let repo = InMemoryCallRepository::new();

    repo.create_call(call_input("MZ102"))
        .await
        .expect("Failed to create call");
    let result = repo.create_call(call_input("MZ102")).await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_duplicate_call_sid_conflicts() {
    let repo = InMemoryCallRepository::new();

    repo.create_call(CreateCallInput {
        call_sid: Some("CA103".to_string()),
        ..call_input("MZ103")
    })
    .await
    .expect("Failed to create call");

    let result = repo
        .create_call(CreateCallInput {
            call_sid: Some("CA103".to_string()),
            ..call_input("MZ104")
        })
        .await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));

    // Taking an existing call_sid through an update conflicts the same way
    let other = repo
        .create_call(call_input("MZ105"))
        .await
        .expect("Failed to create call");
    let result = repo
        .update_call(
            other.id,
            UpdateCallInput {
                call_sid: Some("CA103".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_update_call_touches_only_specified_fields() {
    let repo = InMemoryCallRepository::new();

    let call = repo
        .create_call(CreateCallInput {
            call_sid: Some("CA106".to_string()),
            agent: Some("Morgan".to_string()),
            ..call_input("MZ106")
        })
        .await
        .expect("Failed to create call");

    std::thread::sleep(std::time::Duration::from_millis(5));

    let end = Utc::now();
    let updated = repo
        .update_call(
            call.id,
            UpdateCallInput {
                status: Some(CallStatus::Completed),
                duration: Some(95),
                end_time: Some(end),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to update call");

    assert_eq!(updated.status, CallStatus::Completed);
    assert_eq!(updated.duration, Some(95));
    assert_eq!(updated.end_time, Some(end));
    assert_eq!(updated.call_sid.as_deref(), Some("CA106"));
    assert_eq!(updated.agent.as_deref(), Some("Morgan"));
    assert!(updated.updated_at > call.updated_at);
}

#[tokio::test]
async fn test_update_missing_call_not_found() {
    let repo = InMemoryCallRepository::new();

    let result = repo
        .update_call(
            Uuid::new_v4(),
            UpdateCallInput {
                status: Some(CallStatus::Failed),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_update_missing_call_not_found_even_if_call_sid_taken() {
    let repo = InMemoryCallRepository::new();

    repo.create_call(CreateCallInput {
        call_sid: Some("CA108".to_string()),
        ..call_input("MZ108")
    })
    .await
    .expect("Failed to create call");

    // The unknown id decides; the taken call_sid never comes into play
    let result = repo
        .update_call(
            Uuid::new_v4(),
            UpdateCallInput {
                call_sid: Some("CA108".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_lookup_by_alternate_keys() {
    let repo = InMemoryCallRepository::new();

    let call = repo
        .create_call(CreateCallInput {
            call_sid: Some("CA107".to_string()),
            ..call_input("MZ107")
        })
        .await
        .expect("Failed to create call");

    let by_id = repo
        .get_call_by_id(call.id)
        .await
        .expect("Failed to get call")
        .expect("Call missing");
    let by_stream = repo
        .get_call_by_stream_sid("MZ107")
        .await
        .expect("Failed to get call")
        .expect("Call missing");
    let by_call_sid = repo
        .get_call_by_call_sid("CA107")
        .await
        .expect("Failed to get call")
        .expect("Call missing");

    assert_eq!(by_id.call.id, call.id);
    assert_eq!(by_stream.call.id, call.id);
    assert_eq!(by_call_sid.call.id, call.id);
}

#[tokio::test]
async fn test_missing_records_come_back_none() {
    let repo = InMemoryCallRepository::new();

    assert!(repo
        .get_call_by_id(Uuid::new_v4())
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .get_call_by_stream_sid("MZnope")
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .get_call_by_call_sid("CAnope")
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .get_metadata_by_call(Uuid::new_v4())
        .await
        .expect("Lookup failed")
        .is_none());
}

#[tokio::test]
async fn test_list_calls_newest_first_with_pagination() {
    let repo = InMemoryCallRepository::new();

    for i in 0..5 {
        repo.create_call(call_input(&format!("MZ2{:02}", i)))
            .await
            .expect("Failed to create call");
    }

    let all = repo.list_calls(None, None).await.expect("Failed to list");
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].call.stream_sid, "MZ204");
    assert_eq!(all[4].call.stream_sid, "MZ200");

    let page = repo
        .list_calls(Some(2), Some(1))
        .await
        .expect("Failed to list");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].call.stream_sid, "MZ203");
    assert_eq!(page[1].call.stream_sid, "MZ202");

    let tail = repo
        .list_calls(None, Some(3))
        .await
        .expect("Failed to list");
    assert_eq!(tail.len(), 2);

    let over = repo
        .list_calls(Some(50), None)
        .await
        .expect("Failed to list");
    assert_eq!(over.len(), 5);
}

#[tokio::test]
async fn test_delete_call_cascades_to_children() {
    let repo = InMemoryCallRepository::new();

    let call = repo
        .create_call(call_input("MZ300"))
        .await
        .expect("Failed to create call");
    repo.create_recording(recording_input(call.id, "/tmp/a.wav"))
        .await
        .expect("Failed to create recording");
    repo.create_transcript(transcript_input(call.id, "caller", "hello"))
        .await
        .expect("Failed to create transcript");
    repo.upsert_metadata(UpsertCallMetadataInput {
        call_id: call.id,
        language: Some("en-US".to_string()),
        ..Default::default()
    })
    .await
    .expect("Failed to upsert metadata");

    repo.delete_call(call.id).await.expect("Failed to delete");

    assert!(repo
        .get_call_by_id(call.id)
        .await
        .expect("Lookup failed")
        .is_none());
    assert!(repo
        .get_recordings_by_call(call.id)
        .await
        .expect("Lookup failed")
        .is_empty());
    assert!(repo
        .get_transcripts_by_call(call.id)
        .await
        .expect("Lookup failed")
        .is_empty());
    assert!(repo
        .get_metadata_by_call(call.id)
        .await
        .expect("Lookup failed")
        .is_none());

    // Second delete has nothing to remove
    let result = repo.delete_call(call.id).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_recording_defaults_and_overrides() {
    let repo = InMemoryCallRepository::new();
    let call = repo
        .create_call(call_input("MZ301"))
        .await
        .expect("Failed to create call");

    let defaulted = repo
        .create_recording(recording_input(call.id, "/tmp/default.wav"))
        .await
        .expect("Failed to create recording");
    assert_eq!(defaulted.format, "wav");
    assert_eq!(defaulted.codec, "pcm");
    assert_eq!(defaulted.sample_rate, 8000);
    assert_eq!(defaulted.channels, 1);

    let custom = repo
        .create_recording(CreateRecordingInput {
            format: Some("ogg".to_string()),
            codec: Some("opus".to_string()),
            sample_rate: Some(48000),
            channels: Some(2),
            duration: Some(12.25),
            size_bytes: Some(98_304),
            ..recording_input(call.id, "/tmp/custom.ogg")
        })
        .await
        .expect("Failed to create recording");
    assert_eq!(custom.format, "ogg");
    assert_eq!(custom.codec, "opus");
    assert_eq!(custom.sample_rate, 48000);
    assert_eq!(custom.channels, 2);

    let recordings = repo
        .get_recordings_by_call(call.id)
        .await
        .expect("Failed to get recordings");
    assert_eq!(recordings.len(), 2);
}

#[tokio::test]
async fn test_transcripts_read_back_in_insertion_order() {
    let repo = InMemoryCallRepository::new();
    let call = repo
        .create_call(call_input("MZ302"))
        .await
        .expect("Failed to create call");

    for (speaker, text) in [
        ("caller", "hi, I need help with my invoice"),
        ("agent", "sure, can I have your account number"),
        ("caller", "it's 4417"),
    ] {
        repo.create_transcript(transcript_input(call.id, speaker, text))
            .await
            .expect("Failed to create transcript");
    }

    let transcripts = repo
        .get_transcripts_by_call(call.id)
        .await
        .expect("Failed to get transcripts");
    assert_eq!(transcripts.len(), 3);
    assert_eq!(transcripts[0].speaker, "caller");
    assert_eq!(transcripts[1].speaker, "agent");
    assert_eq!(transcripts[2].text, "it's 4417");
}

#[tokio::test]
async fn test_analytics_read_back_in_snapshot_order() {
    let repo = InMemoryCallRepository::new();
    let call = repo
        .create_call(call_input("MZ303"))
        .await
        .expect("Failed to create call");

    repo.create_analytics(CreateAnalyticsInput {
        call_id: call.id,
        sentiment: Some("neutral".to_string()),
        sentiment_score: Some(0.1),
        ..Default::default()
    })
    .await
    .expect("Failed to create analytics");
    repo.create_analytics(CreateAnalyticsInput {
        call_id: call.id,
        sentiment: Some("positive".to_string()),
        sentiment_score: Some(0.7),
        interruptions: Some(2),
        metrics: Some(serde_json::json!({ "keywords": ["thanks"] })),
        ..Default::default()
    })
    .await
    .expect("Failed to create analytics");

    let snapshots = repo
        .get_analytics_by_call(call.id)
        .await
        .expect("Failed to get analytics");
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].sentiment.as_deref(), Some("neutral"));
    assert_eq!(snapshots[1].sentiment.as_deref(), Some("positive"));
    assert_eq!(snapshots[1].interruptions, Some(2));
    assert!(snapshots[0].snapshot_time <= snapshots[1].snapshot_time);
}

#[tokio::test]
async fn test_metadata_upsert_creates_then_merges() {
    let repo = InMemoryCallRepository::new();
    let call = repo
        .create_call(call_input("MZ304"))
        .await
        .expect("Failed to create call");

    let first = repo
        .upsert_metadata(UpsertCallMetadataInput {
            call_id: call.id,
            language: Some("en-US".to_string()),
            device_type: Some("mobile".to_string()),
            custom_data: Some(serde_json::json!({ "queue": "support" })),
            ..Default::default()
        })
        .await
        .expect("Failed to upsert metadata");
    assert_eq!(first.language.as_deref(), Some("en-US"));

    let second = repo
        .upsert_metadata(UpsertCallMetadataInput {
            call_id: call.id,
            language: Some("es-ES".to_string()),
            region: Some("ES".to_string()),
            ..Default::default()
        })
        .await
        .expect("Failed to upsert metadata");

    // Same record, merged field by field
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.language.as_deref(), Some("es-ES"));
    assert_eq!(second.region.as_deref(), Some("ES"));
    assert_eq!(second.device_type.as_deref(), Some("mobile"));
    assert_eq!(
        second.custom_data,
        Some(serde_json::json!({ "queue": "support" }))
    );
    assert!(second.updated_at >= first.updated_at);

    let fetched = repo
        .get_metadata_by_call(call.id)
        .await
        .expect("Failed to get metadata")
        .expect("Metadata missing");
    assert_eq!(fetched.language.as_deref(), Some("es-ES"));
    assert_eq!(fetched.device_type.as_deref(), Some("mobile"));
}

#[tokio::test]
async fn test_child_records_require_their_call() {
    let repo = InMemoryCallRepository::new();
    let missing = Uuid::new_v4();

    let recording = repo
        .create_recording(recording_input(missing, "/tmp/orphan.wav"))
        .await;
    assert!(matches!(recording, Err(StoreError::NotFound(_))));

    let analytics = repo
        .create_analytics(CreateAnalyticsInput {
            call_id: missing,
            ..Default::default()
        })
        .await;
    assert!(matches!(analytics, Err(StoreError::NotFound(_))));

    let metadata = repo
        .upsert_metadata(UpsertCallMetadataInput {
            call_id: missing,
            language: Some("en-US".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(metadata, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_get_call_hydrates_children() {
    let repo = InMemoryCallRepository::new();
    let call = repo
        .create_call(call_input("MZ305"))
        .await
        .expect("Failed to create call");

    repo.create_recording(recording_input(call.id, "/tmp/h.wav"))
        .await
        .expect("Failed to create recording");
    repo.create_transcript(transcript_input(call.id, "caller", "hello"))
        .await
        .expect("Failed to create transcript");
    repo.create_analytics(CreateAnalyticsInput {
        call_id: call.id,
        sentiment: Some("neutral".to_string()),
        ..Default::default()
    })
    .await
    .expect("Failed to create analytics");
    repo.upsert_metadata(UpsertCallMetadataInput {
        call_id: call.id,
        region: Some("US".to_string()),
        ..Default::default()
    })
    .await
    .expect("Failed to upsert metadata");

    let hydrated = repo
        .get_call_by_id(call.id)
        .await
        .expect("Failed to get call")
        .expect("Call missing");

    assert_eq!(hydrated.recordings.len(), 1);
    assert_eq!(hydrated.transcripts.len(), 1);
    assert_eq!(hydrated.analytics.len(), 1);
    assert_eq!(
        hydrated.metadata.as_ref().and_then(|m| m.region.as_deref()),
        Some("US")
    );

    let listed = repo.list_calls(None, None).await.expect("Failed to list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].recordings.len(), 1);
    assert_eq!(listed[0].transcripts.len(), 1);
}

// Helper functions

fn call_input(stream_sid: &str) -> CreateCallInput {
    CreateCallInput {
        stream_sid: stream_sid.to_string(),
        call_sid: None,
        caller: "+15550100".to_string(),
        agent: None,
    }
}

fn recording_input(call_id: Uuid, file_path: &str) -> CreateRecordingInput {
    CreateRecordingInput {
        call_id,
        file_path: file_path.to_string(),
        file_url: None,
        format: None,
        codec: None,
        sample_rate: None,
        channels: None,
        duration: None,
        size_bytes: None,
    }
}

fn transcript_input(call_id: Uuid, speaker: &str, text: &str) -> CreateTranscriptInput {
    CreateTranscriptInput {
        call_id,
        speaker: speaker.to_string(),
        text: text.to_string(),
        confidence: Some(0.92),
        start_time: None,
        end_time: None,
    }
}
