//! Pipeline orchestrator - coordinates session, forwarding and dispatch.
//!
//! The tracking service is the synthetic watch described by the
//! blueprint's `source` section.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{OutgoingSnapshot, SessionBlueprint};
use ingestion::{BackpressureConfig, DropPolicy};
use dispatcher::MetricsSnapshot;
use signal_engine::{Session, StartOutcome};
use tokio::task::JoinHandle;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracking::MockTrackingService;

use super::{PipelineStats, StopReason};
use crate::error::CliError;

const DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The session blueprint
    pub blueprint: SessionBlueprint,

    /// Stop after this many forwarded snapshots (None = unlimited)
    pub max_snapshots: Option<u64>,

    /// Stop after this long (None = until interrupted)
    pub duration: Option<Duration>,

    /// Decoded-sample queue capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the duration elapses, or the snapshot
    /// limit is reached, then stop everything and report.
    #[instrument(name = "pipeline_run", skip(self, shutdown))]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        ConfigLoader::validate(blueprint).context("invalid session blueprint")?;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Dispatcher
        let (sink_tx, sink_rx) = mpsc::channel::<OutgoingSnapshot>(blueprint.outbox_capacity);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - snapshots will be discarded");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), sink_rx)
            .await
            .map_err(CliError::from)?;
        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Setup Session
        let service = Arc::new(MockTrackingService::synthetic(blueprint.source.clone()));
        let (outbox_tx, mut outbox_rx) =
            mpsc::channel::<OutgoingSnapshot>(blueprint.outbox_capacity);
        let mut session = Session::new(blueprint.to_engine_config(), service, outbox_tx)
            .with_backpressure(BackpressureConfig::new(
                self.config.buffer_size,
                DropPolicy::DropOldest,
            ));

        let mut stats = PipelineStats {
            active_sinks,
            ..Default::default()
        };

        let outcome = match session.start(&blueprint.session.channels).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Sinks still flush and close before the error surfaces
                drop(sink_tx);
                Self::finish_dispatch(dispatcher_handle).await;
                return Err(CliError::from(e).into());
            }
        };

        match outcome {
            StartOutcome::Started(report) => {
                for missing in &report.unavailable {
                    warn!(channel = %missing.channel, reason = %missing.reason, "Channel unavailable, simulating");
                }
                info!(subscribed = ?report.subscribed, "Session started");
                stats.subscribed = report.subscribed.clone();
                stats.unavailable = report
                    .unavailable
                    .iter()
                    .map(|u| u.channel)
                    .collect();
            }
            StartOutcome::AlreadyActive => {
                warn!("Session was already active");
            }
        }

        info!(
            max_snapshots = ?self.config.max_snapshots,
            duration = ?self.config.duration,
            "Pipeline running"
        );

        // Forward session output to the dispatcher
        let deadline = async {
            match self.config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let stop_reason = loop {
            tokio::select! {
                _ = &mut shutdown => break StopReason::Signal,
                _ = &mut deadline => break StopReason::Duration,
                received = outbox_rx.recv() => {
                    let Some(snapshot) = received else {
                        break StopReason::OutboxClosed;
                    };
                    stats.record(&snapshot);

                    if sink_tx.send(snapshot).await.is_err() {
                        warn!("Dispatcher channel closed");
                        break StopReason::OutboxClosed;
                    }

                    if self
                        .config
                        .max_snapshots
                        .is_some_and(|max| stats.snapshots_forwarded >= max)
                    {
                        info!(snapshots = stats.snapshots_forwarded, "Reached snapshot limit");
                        break StopReason::MaxSnapshots;
                    }
                }
            }
        };
        stats.stop_reason = Some(stop_reason);

        // Shutdown
        info!(reason = %stop_reason, "Shutting down pipeline...");
        stats.ingestion = session.ingestion_metrics();
        session.stop().await;
        drop(outbox_rx);
        drop(sink_tx);

        stats.sink_metrics = Self::finish_dispatch(dispatcher_handle).await;

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.snapshot_rate()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Wait for the dispatcher to drain, flush and close its sinks.
    ///
    /// The input sender must already be dropped.
    async fn finish_dispatch(
        handle: JoinHandle<Vec<(String, MetricsSnapshot)>>,
    ) -> Vec<(String, MetricsSnapshot)> {
        match tokio::time::timeout(DISPATCH_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(sink_metrics)) => sink_metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Dispatcher did not finish flushing in time");
                Vec::new()
            }
        }
    }
}

/// Convenience for callers that only need the blueprint
impl From<SessionBlueprint> for PipelineConfig {
    fn from(blueprint: SessionBlueprint) -> Self {
        Self {
            blueprint,
            max_snapshots: None,
            duration: None,
            buffer_size: BackpressureConfig::default().channel_capacity,
            metrics_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};
    use std::collections::HashMap;

    fn fast_blueprint() -> SessionBlueprint {
        let mut blueprint = SessionBlueprint::default();
        blueprint.timing.snapshot_interval_ms = 10;
        blueprint.timing.processing_interval_ms = 50;
        blueprint.simulation.seed = Some(1);
        blueprint.source.seed = Some(1);
        blueprint.sinks = vec![SinkConfig {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 16,
            params: HashMap::from([("every".to_string(), "50".to_string())]),
        }];
        blueprint
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_snapshot_limit() {
        let mut config = PipelineConfig::from(fast_blueprint());
        config.max_snapshots = Some(5);
        config.duration = Some(Duration::from_secs(10));

        let stats = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::MaxSnapshots));
        assert_eq!(stats.snapshots_forwarded, 5);
        assert_eq!(stats.subscribed.len(), 5);
        assert_eq!(stats.sink_metrics.len(), 1);
        assert_eq!(stats.sink_metrics[0].1.write_count, 5);
    }

    #[tokio::test]
    async fn test_pipeline_stops_on_shutdown_signal() {
        let config = PipelineConfig::from(fast_blueprint());
        let shutdown = tokio::time::sleep(Duration::from_millis(100));

        let stats = Pipeline::new(config).run(shutdown).await.unwrap();
        assert_eq!(stats.stop_reason, Some(StopReason::Signal));
    }

    #[tokio::test]
    async fn test_pipeline_fails_when_service_disconnected() {
        let mut blueprint = fast_blueprint();
        blueprint.source.connected = false;

        let result = Pipeline::new(PipelineConfig::from(blueprint))
            .run(std::future::pending())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_start_still_closes_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");

        let mut blueprint = fast_blueprint();
        blueprint.source.connected = false;
        blueprint.sinks.push(SinkConfig {
            name: "jsonl".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 16,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        });

        let err = Pipeline::new(PipelineConfig::from(blueprint))
            .run(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::SessionStart(_))
        ));

        // The file sink was opened, then closed when the dispatcher drained
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_zero_outbox_capacity_is_an_error() {
        let mut blueprint = fast_blueprint();
        blueprint.outbox_capacity = 0;

        let result = Pipeline::new(PipelineConfig::from(blueprint))
            .run(std::future::pending())
            .await;
        assert!(result.is_err());
    }
}
