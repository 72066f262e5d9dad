//! Vertex AI Pipelines adapter.
//!
//! Loads a compiled pipeline spec from the object store, merges the run
//! parameters into its runtime config and creates a `PipelineJob`.
//!
//! Endpoint: POST /v1/projects/{project}/locations/{region}/pipelineJobs
//! Auth: Bearer token

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{ObjectStore, PipelineOrchestrator, RunHandle, TokenSource};
use crate::config::Config;
use crate::domain::{ObjectLocation, RunParameters};

/// Upper bound Vertex AI accepts for a pipeline job id
const MAX_JOB_ID_LEN: usize = 128;

/// Vertex AI Pipelines client
pub struct VertexOrchestrator {
    project: String,
    region: String,
    endpoint: String,
    tokens: TokenSource,
    store: Arc<dyn ObjectStore>,
    client: reqwest::Client,
}

/// Request body and id for one pipeline job
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineJob {
    pub job_id: String,
    pub body: Value,
}

impl VertexOrchestrator {
    /// Create a client for the given project and region
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
        tokens: TokenSource,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
            endpoint: endpoint.into(),
            tokens,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Create from invocation config
    pub fn from_config(config: &Config, tokens: TokenSource, store: Arc<dyn ObjectStore>) -> Self {
        Self::new(
            config.project.clone(),
            config.region.clone(),
            config.vertex_endpoint(),
            tokens,
            store,
        )
    }

    /// Build API URL for the pipeline job collection
    fn jobs_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/pipelineJobs",
            self.endpoint.trim_end_matches('/'),
            self.project,
            self.region
        )
    }

    /// Download and decode the compiled spec
    async fn load_spec(&self, location: &ObjectLocation) -> Result<Value> {
        let bytes = self.store.read(location).await?;

        if location.is_yaml() {
            serde_yaml::from_slice(&bytes)
                .with_context(|| format!("Pipeline spec {} is not valid YAML", location))
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("Pipeline spec {} is not valid JSON", location))
        }
    }
}

/// How run parameters are written into `runtimeConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterEncoding {
    /// Schema 2.0.0: `parameters` with `intValue`/`doubleValue`/`stringValue`
    Typed,
    /// Schema 2.1.0 and later: plain JSON under `parameterValues`
    Untyped,
}

impl ParameterEncoding {
    fn for_spec(pipeline_spec: &Value) -> Result<Self> {
        let version = pipeline_spec
            .get("schemaVersion")
            .and_then(Value::as_str)
            .context("Pipeline spec has no schemaVersion")?;

        match parse_schema_version(version) {
            Some((2, 0)) => Ok(Self::Typed),
            Some((major, minor)) if major > 2 || (major == 2 && minor >= 1) => Ok(Self::Untyped),
            _ => anyhow::bail!("Unsupported pipeline schemaVersion: {}", version),
        }
    }

    fn field(self) -> &'static str {
        match self {
            Self::Typed => "parameters",
            Self::Untyped => "parameterValues",
        }
    }
}

/// `major.minor[.patch]`
fn parse_schema_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

/// Encode one value for a schema 2.0.0 spec from its declared `type`
fn typed_value(name: &str, definition: &Value, value: &Value) -> Result<Value> {
    let kind = definition
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("STRING");

    let typed = match kind {
        "INT" => value.as_i64().map(|v| json!({ "intValue": v })),
        "DOUBLE" => value.as_f64().map(|v| json!({ "doubleValue": v })),
        "STRING" => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(json!({ "stringValue": text }))
        }
        _ => None,
    };

    typed.with_context(|| format!("Parameter '{}' expects {}, got {}", name, kind, value))
}

/// Build the `PipelineJob` request for a compiled spec.
///
/// Accepts both the wrapped job-spec layout (`pipelineSpec` plus
/// `runtimeConfig`) and a bare pipeline spec. Every run parameter must be
/// declared in `root.inputDefinitions`, and a pipeline root must come from
/// either `runtimeConfig.gcsOutputDirectory` or `defaultPipelineRoot`. Run
/// parameters override values the spec already carries.
pub fn build_pipeline_job(
    document: Value,
    parameters: &RunParameters,
    now: DateTime<Utc>,
) -> Result<PipelineJob> {
    let (pipeline_spec, runtime_config) = match document {
        Value::Object(mut map) if map.contains_key("pipelineSpec") => {
            let spec = map.remove("pipelineSpec").unwrap_or(Value::Null);
            (spec, map.remove("runtimeConfig"))
        }
        other => (other, None),
    };

    if !pipeline_spec.is_object() {
        anyhow::bail!("Pipeline spec must be a JSON object");
    }

    let pipeline_name = pipeline_spec
        .pointer("/pipelineInfo/name")
        .and_then(Value::as_str)
        .context("Pipeline spec has no pipelineInfo.name")?
        .to_string();

    let encoding = ParameterEncoding::for_spec(&pipeline_spec)?;

    let empty = Map::new();
    let declared = pipeline_spec
        .pointer("/root/inputDefinitions/parameters")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let undeclared: Vec<&str> = parameters
        .keys()
        .filter(|name| !declared.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !undeclared.is_empty() {
        anyhow::bail!(
            "Parameters not declared by pipeline '{}': {}",
            pipeline_name,
            undeclared.join(", ")
        );
    }

    let mut runtime_config = match runtime_config {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(_) => anyhow::bail!("runtimeConfig must be a JSON object"),
    };

    let has_root = runtime_config
        .get("gcsOutputDirectory")
        .and_then(Value::as_str)
        .is_some_and(|root| !root.is_empty());
    if !has_root {
        let default_root = pipeline_spec
            .get("defaultPipelineRoot")
            .and_then(Value::as_str)
            .filter(|root| !root.is_empty())
            .with_context(|| {
                format!(
                    "Pipeline '{}' has no pipeline root: set runtimeConfig.gcsOutputDirectory or defaultPipelineRoot",
                    pipeline_name
                )
            })?;
        runtime_config.insert(
            "gcsOutputDirectory".to_string(),
            Value::String(default_root.to_string()),
        );
    }

    let values = runtime_config
        .entry(encoding.field())
        .or_insert_with(|| Value::Object(Map::new()));
    let values = values
        .as_object_mut()
        .with_context(|| format!("runtimeConfig.{} must be a JSON object", encoding.field()))?;
    for (name, value) in parameters {
        let encoded = match encoding {
            ParameterEncoding::Typed => typed_value(name, &declared[name.as_str()], value)?,
            ParameterEncoding::Untyped => value.clone(),
        };
        values.insert(name.clone(), encoded);
    }

    let job_id = job_id(&pipeline_name, now);
    let body = json!({
        "displayName": pipeline_name,
        "pipelineSpec": pipeline_spec,
        "runtimeConfig": runtime_config,
    });

    Ok(PipelineJob { job_id, body })
}

/// `<name>-<timestamp>`, lowercased, with each run of characters outside
/// `[-0-9a-z]` collapsed into one dash and no dash at either end
fn job_id(pipeline_name: &str, now: DateTime<Utc>) -> String {
    let raw = format!("{}-{}", pipeline_name, now.format("%Y%m%d%H%M%S")).to_ascii_lowercase();

    let mut id = String::with_capacity(raw.len());
    let mut replacing = false;
    for c in raw.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            id.push(c);
            replacing = false;
        } else if !replacing {
            id.push('-');
            replacing = true;
        }
    }

    let mut id = id.trim_matches('-').to_string();
    id.truncate(MAX_JOB_ID_LEN);
    id.trim_end_matches('-').to_string()
}

#[async_trait]
impl PipelineOrchestrator for VertexOrchestrator {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn submit_run(
        &self,
        spec_location: &str,
        parameters: &RunParameters,
    ) -> Result<RunHandle> {
        let location = ObjectLocation::parse(spec_location)
            .with_context(|| format!("Invalid pipeline spec location: {}", spec_location))?;

        let document = self.load_spec(&location).await?;
        let job = build_pipeline_job(document, parameters, Utc::now())?;
        debug!(job_id = %job.job_id, "Built pipeline job request");

        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(self.jobs_url())
            .query(&[("pipelineJobId", job.job_id.as_str())])
            .bearer_auth(token)
            .json(&job.body)
            .send()
            .await
            .context("Failed to send pipeline job request")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Vertex AI error ({}): {}", status, text);
        }

        let created: Value = response
            .json()
            .await
            .context("Failed to parse Vertex AI response")?;

        info!(job_id = %job.job_id, "Pipeline job created");
        Ok(RunHandle(created))
    }
}
