//! Trigger Handler Integration Tests
//!
//! Runs the full decode, validate and submit sequence against in-memory
//! stand-ins for the object store and the orchestration service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use pipeline_trigger::{
    Config, InvocationEvent, ObjectLocation, ObjectStore, PipelineOrchestrator, RunHandle,
    RunParameters, TriggerError, TriggerHandler,
};
use serde_json::{json, Value};

/// Object store backed by a set of `bucket/object` keys
#[derive(Default)]
struct MemoryStore {
    objects: HashSet<String>,
    lookups: Mutex<Vec<ObjectLocation>>,
    unavailable: bool,
}

impl MemoryStore {
    fn with_objects(keys: &[&str]) -> Self {
        Self {
            objects: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    fn lookups(&self) -> Vec<ObjectLocation> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, location: &ObjectLocation) -> Result<bool> {
        self.lookups.lock().unwrap().push(location.clone());
        if self.unavailable {
            anyhow::bail!("store unavailable");
        }
        Ok(self
            .objects
            .contains(&format!("{}/{}", location.bucket, location.object)))
    }

    async fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        anyhow::bail!("read not supported for {}", location)
    }
}

/// Orchestrator that records every submission
#[derive(Default)]
struct RecordingOrchestrator {
    calls: Mutex<Vec<(String, Value)>>,
    reject: bool,
}

impl RecordingOrchestrator {
    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineOrchestrator for RecordingOrchestrator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn submit_run(
        &self,
        spec_location: &str,
        parameters: &RunParameters,
    ) -> Result<RunHandle> {
        self.calls.lock().unwrap().push((
            spec_location.to_string(),
            Value::Object(parameters.clone()),
        ));
        if self.reject {
            anyhow::bail!("quota exceeded");
        }
        let n = self.calls.lock().unwrap().len();
        Ok(RunHandle(json!({
            "name": format!("projects/proj/locations/us-central1/pipelineJobs/run-{}", n)
        })))
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    orchestrator: Arc<RecordingOrchestrator>,
    handler: TriggerHandler,
}

impl Fixture {
    fn new(store: MemoryStore, orchestrator: RecordingOrchestrator) -> Self {
        let store = Arc::new(store);
        let orchestrator = Arc::new(orchestrator);
        let handler = TriggerHandler::new(store.clone(), orchestrator.clone());
        Self {
            store,
            orchestrator,
            handler,
        }
    }
}

fn config() -> Config {
    Config::new("proj", "us-central1")
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[tokio::test]
async fn test_payload_location_is_submitted_without_reserved_key() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://b/spec.json",
        "alpha": 1
    }));

    let handle = fx.handler.handle(&config(), &event).await.unwrap();

    assert_eq!(
        fx.orchestrator.calls(),
        vec![("gs://b/spec.json".to_string(), json!({"alpha": 1}))]
    );
    assert_eq!(
        handle.name(),
        Some("projects/proj/locations/us-central1/pipelineJobs/run-1")
    );
    assert_eq!(
        fx.store.lookups(),
        vec![ObjectLocation {
            bucket: "b".to_string(),
            object: "spec.json".to_string()
        }]
    );
}

#[tokio::test]
async fn test_configured_fallback_is_used_unchanged() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/pipelines/default.json"]),
        RecordingOrchestrator::default(),
    );
    let config = config().with_default_spec_location("gs://b/pipelines/default.json");
    let event = InvocationEvent::from_json(&json!({"alpha": 1, "beta": "x"}));

    fx.handler.handle(&config, &event).await.unwrap();

    assert_eq!(
        fx.orchestrator.calls(),
        vec![(
            "gs://b/pipelines/default.json".to_string(),
            json!({"alpha": 1, "beta": "x"})
        )]
    );
}

#[tokio::test]
async fn test_missing_location_skips_store_and_submission() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({"alpha": 1}));

    let err = fx.handler.handle(&config(), &event).await.unwrap_err();

    assert!(matches!(err, TriggerError::MissingLocation));
    assert!(fx.store.lookups().is_empty());
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_missing_artifact_is_never_submitted() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://b/missing.json"
    }));

    let err = fx.handler.handle(&config(), &event).await.unwrap_err();

    match err {
        TriggerError::ArtifactNotFound { location } => {
            assert_eq!(location, "gs://b/missing.json")
        }
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
    assert_eq!(fx.store.lookups().len(), 1);
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_unsplittable_location_is_not_found() {
    let fx = Fixture::new(MemoryStore::default(), RecordingOrchestrator::default());
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://bucket-only"
    }));

    let err = fx.handler.handle(&config(), &event).await.unwrap_err();

    assert!(matches!(err, TriggerError::ArtifactNotFound { .. }));
    assert!(fx.store.lookups().is_empty());
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_missing_project_fails_before_decoding() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    // Undecodable on purpose: a decoding error here would mean config was read too late
    let event = InvocationEvent::new("%%% not base64 %%%", Value::Null);

    let err = fx
        .handler
        .invoke(env(&[("REGION", "us-central1")]), &event)
        .await
        .unwrap_err();

    assert!(matches!(err, TriggerError::Configuration(_)));
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_invoke_reads_environment_fallback() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({"alpha": 1}));

    fx.handler
        .invoke(
            env(&[
                ("PROJECT", "proj"),
                ("REGION", "us-central1"),
                ("GCS_PIPELINE_FILE_LOCATION", "gs://b/spec.json"),
            ]),
            &event,
        )
        .await
        .unwrap();

    assert_eq!(fx.orchestrator.calls().len(), 1);
    assert_eq!(fx.orchestrator.calls()[0].0, "gs://b/spec.json");
}

#[tokio::test]
async fn test_decoding_and_parsing_errors() {
    let fx = Fixture::new(MemoryStore::default(), RecordingOrchestrator::default());

    let bad_base64 = InvocationEvent::new("!!!", Value::Null);
    assert!(matches!(
        fx.handler.handle(&config(), &bad_base64).await,
        Err(TriggerError::Decoding(_))
    ));

    let not_json = InvocationEvent::new("bm90IGpzb24=", Value::Null); // "not json"
    assert!(matches!(
        fx.handler.handle(&config(), &not_json).await,
        Err(TriggerError::Parsing(_))
    ));

    let not_object = InvocationEvent::from_json(&json!(["gs://b/spec.json"]));
    assert!(matches!(
        fx.handler.handle(&config(), &not_object).await,
        Err(TriggerError::Parsing(_))
    ));

    assert!(fx.store.lookups().is_empty());
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_not_treated_as_missing() {
    let store = MemoryStore {
        unavailable: true,
        ..Default::default()
    };
    let fx = Fixture::new(store, RecordingOrchestrator::default());
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://b/spec.json"
    }));

    let err = fx.handler.handle(&config(), &event).await.unwrap_err();

    assert!(matches!(err, TriggerError::Storage { .. }));
    assert!(fx.orchestrator.calls().is_empty());
}

#[tokio::test]
async fn test_submission_error_is_propagated() {
    let orchestrator = RecordingOrchestrator {
        reject: true,
        ..Default::default()
    };
    let fx = Fixture::new(MemoryStore::with_objects(&["b/spec.json"]), orchestrator);
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://b/spec.json"
    }));

    let err = fx.handler.handle(&config(), &event).await.unwrap_err();

    match err {
        TriggerError::Submission(source) => assert_eq!(source.to_string(), "quota exceeded"),
        other => panic!("expected Submission, got {:?}", other),
    }
    // One attempt only
    assert_eq!(fx.orchestrator.calls().len(), 1);
}

#[tokio::test]
async fn test_redelivery_submits_again() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "gs://b/spec.json",
        "alpha": 1
    }));

    let first = fx.handler.handle(&config(), &event).await.unwrap();
    let second = fx.handler.handle(&config(), &event).await.unwrap();

    assert_ne!(first.name(), second.name());
    assert_eq!(fx.orchestrator.calls().len(), 2);
}

#[tokio::test]
async fn test_padded_location_is_checked_and_submitted_trimmed() {
    let fx = Fixture::new(
        MemoryStore::with_objects(&["b/spec.json"]),
        RecordingOrchestrator::default(),
    );
    let event = InvocationEvent::from_json(&json!({
        "gcs_pipeline_file_location": "  gs://b/spec.json  ",
        "alpha": 1
    }));

    fx.handler.handle(&config(), &event).await.unwrap();

    assert_eq!(fx.store.lookups().len(), 1);
    assert_eq!(
        fx.orchestrator.calls(),
        vec![("gs://b/spec.json".to_string(), json!({"alpha": 1}))]
    );
}
