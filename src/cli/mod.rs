//! Command-line interface for pipeline-trigger.
//!
//! Stands in for the hosting runtime: reads one event, resolves
//! configuration from the environment and runs the trigger handler.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::adapters::{GcsObjectStore, ObjectStore, TokenSource, VertexOrchestrator};
use crate::config::Config;
use crate::core::TriggerHandler;
use crate::domain::{InvocationEvent, PushEnvelope};

/// pipeline-trigger - launch Vertex AI pipeline runs from Pub/Sub events
#[derive(Parser, Debug)]
#[command(name = "pipeline-trigger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle one event and submit the pipeline run
    Trigger {
        /// Event file (reads from stdin if not provided)
        #[arg(short, long)]
        event: Option<PathBuf>,

        /// Input is a Pub/Sub push request body rather than a bare event
        #[arg(long)]
        push: bool,
    },

    /// Wrap a JSON parameter document into an event
    Encode {
        /// JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Trigger { event, push } => trigger(event, push).await,
            Commands::Encode { file } => encode(file),
            Commands::Config => show_config(),
        }
    }
}

/// Read a file, or stdin when no path is given
fn read_input(path: Option<PathBuf>) -> Result<String> {
    let input = if let Some(path) = path {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    };

    if input.trim().is_empty() {
        anyhow::bail!("No input provided. Use a file argument or pipe to stdin");
    }

    Ok(input)
}

/// Parse an event body, either bare or wrapped in a push envelope
pub fn parse_event(input: &str, push: bool) -> Result<InvocationEvent> {
    if push {
        let envelope: PushEnvelope =
            serde_json::from_str(input).context("Failed to parse Pub/Sub push request")?;
        Ok(envelope.into())
    } else {
        serde_json::from_str(input).context("Failed to parse event")
    }
}

/// Build an event from a JSON parameter document
pub fn encode_event(input: &str) -> Result<InvocationEvent> {
    let payload: Value = serde_json::from_str(input).context("Parameters are not valid JSON")?;
    if !payload.is_object() {
        anyhow::bail!("Parameters must be a JSON object");
    }
    Ok(InvocationEvent::from_json(&payload))
}

/// Handle one event against the real services
async fn trigger(event_file: Option<PathBuf>, push: bool) -> Result<()> {
    // Configuration first, so a bad environment fails before any input is read
    let config = Config::from_env()?;

    let input = read_input(event_file)?;
    let event = parse_event(&input, push)?;

    let tokens = TokenSource::from_option(config.access_token.clone());
    let store: Arc<dyn ObjectStore> = match &config.storage_endpoint {
        Some(endpoint) => Arc::new(GcsObjectStore::with_endpoint(endpoint.clone(), tokens.clone())),
        None => Arc::new(GcsObjectStore::new(tokens.clone())),
    };
    let orchestrator = Arc::new(VertexOrchestrator::from_config(
        &config,
        tokens,
        Arc::clone(&store),
    ));

    let handler = TriggerHandler::new(store, orchestrator);
    let handle = handler.handle(&config, &event).await?;

    println!("{}", serde_json::to_string_pretty(&handle.into_inner())?);
    Ok(())
}

fn encode(file: Option<PathBuf>) -> Result<()> {
    let input = read_input(file)?;
    let event = encode_event(&input)?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = Config::from_env()?;

    println!("Project:           {}", cfg.project);
    println!("Region:            {}", cfg.region);
    println!(
        "Default spec:      {}",
        cfg.default_spec_location.as_deref().unwrap_or("(none)")
    );
    println!("Vertex endpoint:   {}", cfg.vertex_endpoint());
    println!(
        "Storage endpoint:  {}",
        cfg.storage_endpoint
            .as_deref()
            .unwrap_or(crate::adapters::gcs::DEFAULT_STORAGE_ENDPOINT)
    );
    println!(
        "Access token:      {}",
        if cfg.access_token.is_some() {
            "(set)"
        } else {
            "(metadata server)"
        }
    );

    Ok(())
}
