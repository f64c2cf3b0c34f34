//! Per-sink worker
//!
//! Each sink drains its own bounded queue on its own task, so a slow file
//! or an unreachable companion only loses its own snapshots.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, OutgoingSnapshot};

use crate::metrics::SinkMetrics;

pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<OutgoingSnapshot>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Start a worker owning `sink`, fed through a queue of `queue_capacity`
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a snapshot for the sink (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full or the worker is
    /// gone (snapshot dropped).
    pub fn try_send(&self, snapshot: OutgoingSnapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => {
                self.metrics.inc_queued_count();
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(snapshot)) => {
                self.metrics.inc_dropped_count();
                metrics::counter!("biosync_sink_writes_total", "sink" => self.name.clone(), "status" => "dropped")
                    .increment(1);
                warn!(
                    sink = %self.name,
                    timestamp = snapshot.timestamp,
                    "Queue full, snapshot dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(snapshot)) => {
                self.metrics.inc_dropped_count();
                error!(sink = %self.name, timestamp = snapshot.timestamp, "Sink worker gone, snapshot dropped");
                false
            }
        }
    }

    /// Close the queue and wait for the worker.
    ///
    /// Queued snapshots are written before the sink is flushed and closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Sink worker panicked");
        }
        debug!(sink = %self.name, "Sink drained");
    }
}

#[instrument(
    name = "sink_worker",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<OutgoingSnapshot>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker waiting for snapshots");

    while let Some(snapshot) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        let started = Instant::now();
        let result = sink.write(&snapshot).await;
        metrics::histogram!("biosync_sink_write_duration_seconds", "sink" => name.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                metrics.inc_write_count();
                metrics::counter!("biosync_sink_writes_total", "sink" => name.clone(), "status" => "ok")
                    .increment(1);
            }
            Err(e) => {
                metrics.inc_failure_count();
                metrics::counter!("biosync_sink_writes_total", "sink" => name.clone(), "status" => "error")
                    .increment(1);
                error!(
                    sink = %name,
                    timestamp = snapshot.timestamp,
                    error = %e,
                    "Snapshot write failed"
                );
                // One bad write never stops the worker
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Final flush failed");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Sink close failed");
    }

    debug!(sink = %name, "Sink worker exited");
}
