//! Trigger handler: turns one queue event into one pipeline run.
//!
//! Steps run strictly in order and stop at the first failure:
//! decode, parse, resolve the spec location, check it exists, submit.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::adapters::{ObjectStore, PipelineOrchestrator, RunHandle};
use crate::config::Config;
use crate::domain::{InvocationEvent, ObjectLocation, RunRequest};

use super::error::TriggerError;

/// Forwards run requests from events to the orchestration service
pub struct TriggerHandler {
    store: Arc<dyn ObjectStore>,
    orchestrator: Arc<dyn PipelineOrchestrator>,
}

impl TriggerHandler {
    /// Create a handler over the given services
    pub fn new(store: Arc<dyn ObjectStore>, orchestrator: Arc<dyn PipelineOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Resolve configuration through `lookup`, then handle the event.
    ///
    /// Configuration errors surface before the event is looked at.
    pub async fn invoke<F>(
        &self,
        lookup: F,
        event: &InvocationEvent,
    ) -> Result<RunHandle, TriggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config::from_lookup(lookup).map_err(|e| {
            error!(kind = e.kind(), error = %e, "Invocation failed");
            e
        })?;
        self.handle(&config, event).await
    }

    /// Handle a single event.
    ///
    /// `config` must already be resolved for this invocation. Nothing is
    /// retried and redelivered events are submitted again.
    #[instrument(
        skip(self, config, event),
        fields(project = %config.project, region = %config.region)
    )]
    pub async fn handle(
        &self,
        config: &Config,
        event: &InvocationEvent,
    ) -> Result<RunHandle, TriggerError> {
        let result = self.process(config, event).await;
        if let Err(ref e) = result {
            error!(kind = e.kind(), error = %e, "Invocation failed");
        }
        result
    }

    async fn process(
        &self,
        config: &Config,
        event: &InvocationEvent,
    ) -> Result<RunHandle, TriggerError> {
        let data = event.decode_payload()?;
        info!(context = %event.context, "Event data: {}", data);

        let request = RunRequest::parse(&data)?;
        let spec_location =
            request.resolve_spec_location(config.default_spec_location.as_deref())?;

        self.ensure_exists(&spec_location).await?;

        info!(
            %spec_location,
            parameters = %serde_json::Value::Object(request.parameters.clone()),
            "Submitting pipeline run"
        );

        let handle = self
            .orchestrator
            .submit_run(&spec_location, &request.parameters)
            .await
            .map_err(TriggerError::Submission)?;

        info!(
            orchestrator = self.orchestrator.name(),
            job = handle.name().unwrap_or("<unnamed>"),
            response = %handle,
            "Pipeline run submitted"
        );

        Ok(handle)
    }

    /// Fail unless the spec object is present in the store
    async fn ensure_exists(&self, spec_location: &str) -> Result<(), TriggerError> {
        let not_found = || TriggerError::ArtifactNotFound {
            location: spec_location.to_string(),
        };

        let location = ObjectLocation::parse(spec_location).ok_or_else(not_found)?;

        let exists = self
            .store
            .exists(&location)
            .await
            .map_err(|source| TriggerError::Storage {
                location: spec_location.to_string(),
                source,
            })?;

        if exists {
            Ok(())
        } else {
            Err(not_found())
        }
    }
}
