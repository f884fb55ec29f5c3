//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::future::Future;
use std::pin::Pin;
use tally_adapter::{FieldExtractionAdapter, FilePreprocessor, HttpInferenceClient};
use tally_pipeline::{enumerate_inputs, open_checkpoint, pending_items, Orchestrator, PipelineError};
use tally_validate::Validator;
use tracing::{info, warn};

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(args: RunArgs, config: &mut Config) {
    if let Some(input) = args.input {
        config.pipeline.input_dir = input;
    }
    if let Some(checkpoint) = args.checkpoint {
        config.pipeline.checkpoint_path = checkpoint;
    }
    if let Some(concurrency) = args.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if let Some(endpoint) = args.endpoint {
        config.adapter.endpoint = endpoint;
    }
}

/// Execute the run command.
pub async fn execute_run(args: RunArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    apply_overrides(args, &mut config);
    config.validate()?;

    let items = enumerate_inputs(&config.pipeline)?;
    let store = open_checkpoint(&config.pipeline.checkpoint_path)?;
    // The blocking client must be built off the async worker threads
    let adapter_config = config.adapter.clone();
    let client = tokio::task::spawn_blocking(move || HttpInferenceClient::from_config(&adapter_config))
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;
    info!(
        endpoint = client.endpoint(),
        inputs = items.len(),
        pending = pending_items(&items, &store).len(),
        "Starting run"
    );

    let adapter = FieldExtractionAdapter::new(client.clone(), client.clone(), client, config.adapter.clone());
    let total = items.len();
    let orchestrator = Orchestrator::new(
        FilePreprocessor::new(),
        adapter,
        Validator::new(config.validation.clone()),
        store,
        config.pipeline.clone(),
    );

    let shutdown: Pin<Box<dyn Future<Output = ()> + Send>> = if config.pipeline.stop_on_interrupt {
        Box::pin(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
    } else {
        Box::pin(std::future::pending())
    };

    let summary = orchestrator
        .run_until_interrupted(items, shutdown, |outcome| {
            if let Some(line) = formatter.progress(outcome, total) {
                println!("{}", line);
            }
        })
        .await?;

    println!("{}", formatter.run_summary(&summary)?);

    if summary.metrics.failed > 0 {
        return Err(CliError::ItemsFailed(summary.metrics.failed));
    }
    Ok(())
}
