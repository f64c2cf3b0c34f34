//! `run` command implementation.

use anyhow::Result;
use contracts::SessionBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::load_blueprint;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(seed) = args.seed {
        info!(seed, "Overriding simulation seed from CLI");
        blueprint.simulation.seed = Some(seed);
    }

    info!(
        channels = ?blueprint.session.channels,
        unavailable = ?blueprint.source.unavailable,
        snapshot_interval_ms = blueprint.timing.snapshot_interval_ms,
        processing_interval_ms = blueprint.timing.processing_interval_ms,
        sinks = blueprint.sinks.len(),
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

    let pipeline_config = PipelineConfig {
        blueprint,
        max_snapshots: (args.max_snapshots > 0).then_some(args.max_snapshots),
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        buffer_size: args.buffer_size.max(1),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting session...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await?;

    info!(
        snapshots = stats.snapshots_forwarded,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.snapshot_rate()),
        "Session completed"
    );
    stats.print_summary();

    info!("biosync finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that fails to install never resolves; the other one (or the
/// duration/limit) still ends the run.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
    warn!("Received shutdown signal, stopping session...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Session:");
    println!("  Channels: {:?}", blueprint.session.channels);
    if !blueprint.source.unavailable.is_empty() {
        println!("  Unavailable (simulated): {:?}", blueprint.source.unavailable);
    }

    let timing = &blueprint.timing;
    println!("\nTiming:");
    println!("  Snapshot every: {} ms", timing.snapshot_interval_ms);
    println!("  Metrics every: {} ms", timing.processing_interval_ms);
    println!("  Stale after: {} ms", timing.stale_threshold_ms);

    println!("\nSimulation:");
    println!("  Enabled: {}", blueprint.simulation.enabled);
    match blueprint.simulation.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: (entropy)"),
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
