//! Session lifecycle
//!
//! A session is either Idle or Active. Starting subscribes the requested
//! channels and spawns three tasks over one [`SharedState`]:
//! - ingest: drains decoded samples into the record and windows
//! - processing: recomputes derived metrics on the slow cadence
//! - snapshot: assembles and publishes on the fast cadence
//!
//! Stopping cancels all three, waits for them, then clears the state.

use std::sync::Arc;
use std::time::Duration;

use contracts::{ChannelKind, Clock, EngineConfig, OutgoingSnapshot, SystemClock, TrackingService};
use ingestion::{BackpressureConfig, IngestionPipeline, MetricsSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracking::{subscribe_channels, UnavailableChannel};
use tracing::{debug, info, instrument, warn};

use crate::assembler::{run_snapshot_loop, SnapshotAssembler};
use crate::calculator::{run_processing_loop, MetricsCalculator};
use crate::error::{EngineError, Result};
use crate::ingest::{run_ingest_loop, SampleIngest};
use crate::simulation::SimulationState;
use crate::staleness::StalenessResolver;
use crate::state::SharedState;

/// Connection status published to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected { tracking: Vec<ChannelKind> },
    Failed { reason: String },
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionStatus::Connected { .. })
    }
}

/// What a successful start subscribed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    pub subscribed: Vec<ChannelKind>,
    /// Refused channels; their fields fall back to simulation
    pub unavailable: Vec<UnavailableChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(StartReport),
    /// A session was already running; nothing changed
    AlreadyActive,
}

struct ActiveSession {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    pipeline: IngestionPipeline,
    report: StartReport,
}

/// Signal engine session over a tracking service
pub struct Session<S> {
    config: EngineConfig,
    service: Arc<S>,
    state: Arc<SharedState>,
    clock: Arc<dyn Clock>,
    backpressure: BackpressureConfig,
    outbox: mpsc::Sender<OutgoingSnapshot>,
    status: watch::Sender<SessionStatus>,
    active: Option<ActiveSession>,
}

impl<S> Session<S>
where
    S: TrackingService + 'static,
{
    /// Create an idle session publishing snapshots into `outbox`
    pub fn new(config: EngineConfig, service: Arc<S>, outbox: mpsc::Sender<OutgoingSnapshot>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Disconnected);
        Self {
            state: Arc::new(SharedState::new(&config.windows)),
            config,
            service,
            clock: Arc::new(SystemClock),
            backpressure: BackpressureConfig::default(),
            outbox,
            status,
            active: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_backpressure(mut self, backpressure: BackpressureConfig) -> Self {
        self.backpressure = backpressure;
        self
    }

    /// Subscribe `channels` and start the loops.
    ///
    /// Ignored while a session is already active; use [`Session::restart`]
    /// to re-subscribe.
    ///
    /// # Errors
    /// [`EngineError::TrackingUnavailable`] when the tracking service can't
    /// be reached. Status becomes `Failed` and no task is spawned.
    #[instrument(name = "session_start", skip(self, channels), fields(requested = channels.len()))]
    pub async fn start(&mut self, channels: &[ChannelKind]) -> Result<StartOutcome> {
        if self.active.is_some() {
            info!("session already active, start ignored");
            return Ok(StartOutcome::AlreadyActive);
        }

        self.status.send_replace(SessionStatus::Connecting);

        // New session: nothing observed yet
        self.state.reset();

        let subscription = match subscribe_channels(self.service.as_ref(), channels) {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "tracking service unavailable, session not started");
                self.status.send_replace(SessionStatus::Failed {
                    reason: e.to_string(),
                });
                return Err(EngineError::from(e));
            }
        };

        let report = StartReport {
            subscribed: subscription.subscribed_channels(),
            unavailable: subscription.unavailable,
        };

        let mut pipeline =
            IngestionPipeline::with_config(self.backpressure.clone()).with_clock(self.clock.clone());
        for source in subscription.sources {
            pipeline.register_sensor_source(source, None);
        }
        let rx = pipeline
            .take_receiver()
            .ok_or_else(|| EngineError::Config("ingestion receiver already taken".to_string()))?;

        let token = CancellationToken::new();
        let timing = &self.config.timing;
        let tasks = vec![
            tokio::spawn(run_ingest_loop(
                SampleIngest::new(self.state.clone()),
                rx,
                token.child_token(),
            )),
            tokio::spawn(run_processing_loop(
                self.state.clone(),
                MetricsCalculator::new(&self.config.windows),
                self.clock.clone(),
                Duration::from_millis(timing.processing_interval_ms),
                token.child_token(),
            )),
            tokio::spawn(run_snapshot_loop(
                self.state.clone(),
                SnapshotAssembler::new(
                    StalenessResolver::new(timing.stale_threshold_ms),
                    SimulationState::new(self.config.simulation.seed),
                    self.config.simulation.enabled,
                ),
                self.clock.clone(),
                Duration::from_millis(timing.snapshot_interval_ms),
                self.outbox.clone(),
                token.child_token(),
            )),
        ];

        // Sources start last so no sample arrives before the ingest task exists
        pipeline.start_all();

        info!(
            subscribed = ?report.subscribed,
            unavailable = report.unavailable.len(),
            "session started"
        );
        self.status.send_replace(SessionStatus::Connected {
            tracking: report.subscribed.clone(),
        });

        self.active = Some(ActiveSession {
            token,
            tasks,
            pipeline,
            report: report.clone(),
        });
        Ok(StartOutcome::Started(report))
    }

    /// Stop the loops and sources, then clear every buffer and record.
    ///
    /// A no-op when idle.
    #[instrument(name = "session_stop", skip(self))]
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("session idle, stop ignored");
            return;
        };

        active.token.cancel();
        active.pipeline.stop_all();

        for task in active.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        drop(active.pipeline);

        self.state.reset();
        self.status.send_replace(SessionStatus::Disconnected);
        info!("session stopped");
    }

    /// Stop (if active) and start again with a new channel set
    pub async fn restart(&mut self, channels: &[ChannelKind]) -> Result<StartOutcome> {
        self.stop().await;
        self.start(channels).await
    }

    /// Watch the connection status
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn report(&self) -> Option<&StartReport> {
        self.active.as_ref().map(|active| &active.report)
    }

    pub fn state(&self) -> Arc<SharedState> {
        self.state.clone()
    }

    pub fn ingestion_metrics(&self) -> Option<MetricsSnapshot> {
        self.active
            .as_ref()
            .map(|active| active.pipeline.metrics().snapshot())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        // Tasks can't be awaited here; cancelling is enough for them to exit
        if let Some(active) = self.active.take() {
            active.token.cancel();
            active.pipeline.stop_all();
        }
    }
}
