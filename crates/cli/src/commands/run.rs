//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::DispatchBlueprint;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, StopReason, Workload};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let blueprint = load_blueprint(args)?;

    info!(
        threshold_ms = blueprint.scheduler.delay_threshold_ms,
        tick_ms = blueprint.scheduler.tick_interval().as_millis(),
        policy = ?blueprint.scheduler.shutdown_policy,
        sessions = blueprint.sessions.len(),
        "Configuration loaded"
    );
    for warning in config_loader::ConfigLoader::warnings(&blueprint) {
        warn!("{}", warning);
    }

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        workload: Workload {
            messages: args.messages,
            producers: args.producers,
            interval: Duration::from_millis(args.interval_ms),
            payload_size: args.payload_size,
        },
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    let timeout = async {
        match args.timeout {
            0 => std::future::pending::<()>().await,
            secs => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
    };
    // Stopping only ends production; the pipeline still shuts the
    // dispatcher down with the configured policy.
    let stop = async {
        tokio::select! {
            _ = timeout => StopReason::Timeout,
            _ = shutdown_signal() => {
                warn!("Received shutdown signal, stopping run...");
                StopReason::Signal
            }
        }
    };

    info!("Starting run...");

    let stats = pipeline.run_until(stop).await.context("Run failed")?;
    info!(
        dispatched = stats.metrics.dispatched_count,
        failed = stats.metrics.failure_count,
        discarded = stats.metrics.discarded_count,
        retained = stats.retained,
        duration_secs = stats.duration.as_secs_f64(),
        "Run completed"
    );
    stats.print_summary();

    if stats.interrupted == Some(StopReason::Timeout) {
        return Err(CliError::Timeout {
            seconds: args.timeout,
        }
        .into());
    }

    info!("dispatchq finished");
    Ok(())
}

/// Load the configuration file (or defaults) and apply CLI overrides
fn load_blueprint(args: &RunArgs) -> Result<DispatchBlueprint> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            DispatchBlueprint::default()
        }
    };

    if let Some(threshold_ms) = args.threshold_ms {
        info!(threshold_ms, "Overriding delay threshold from CLI");
        blueprint.scheduler.delay_threshold_ms = threshold_ms;
    }
    if let Some(tick_ms) = args.tick_ms {
        info!(tick_ms, "Overriding tick interval from CLI");
        blueprint.scheduler.tick_interval_ms = Some(tick_ms);
    }
    if let Some(policy) = args.policy {
        blueprint.scheduler.shutdown_policy = policy.into();
    }

    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    Ok(blueprint)
}

/// Resolve on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed the corresponding branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DispatchBlueprint) {
    let scheduler = &blueprint.scheduler;
    println!("\n=== Configuration Summary ===\n");
    println!("Scheduler:");
    println!("  Delay threshold: {} ms", scheduler.delay_threshold_ms);
    println!("  Tick interval: {} ms", scheduler.tick_interval().as_millis());
    println!("  Shutdown policy: {:?}", scheduler.shutdown_policy);

    println!("\nSessions ({}):", blueprint.sessions.len());
    for session in &blueprint.sessions {
        match &session.contact {
            Some(contact) => println!(
                "  - {} ({:?}) -> {}",
                session.id, session.kind, contact.endpoint.id
            ),
            None => println!("  - {} ({:?})", session.id, session.kind),
        }
    }

    println!();
}
