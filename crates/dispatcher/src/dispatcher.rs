//! Snapshot fan-out
//!
//! Consumes the session outbox and offers every snapshot to each sink
//! queue. The loop never waits on a sink.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{OutgoingSnapshot, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<OutgoingSnapshot>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<OutgoingSnapshot>) -> Self {
        Self { config, input_rx }
    }

    /// Open every configured sink; fails on the first that can't be opened
    #[instrument(name = "dispatcher_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_open_sinks",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            match create_sink_handle(sink_config).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Don't leak workers already started
                    for handle in handles {
                        handle.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(handles)
    }
}

#[instrument(
    name = "dispatcher_open_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, &config.params);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans snapshots out to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<OutgoingSnapshot>,
}

impl Dispatcher {
    /// Dispatch to already running handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<OutgoingSnapshot>,
    ) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Forward until the outbox closes.
    ///
    /// Returns the final per-sink counters, taken after every sink has been
    /// flushed and closed.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatching snapshots");

        let mut snapshot_count: u64 = 0;

        while let Some(snapshot) = self.input_rx.recv().await {
            snapshot_count += 1;
            self.dispatch(&snapshot);

            if snapshot_count.is_multiple_of(100) {
                debug!(snapshots = snapshot_count, "Dispatcher progress");
            }
        }

        info!(
            snapshots = snapshot_count,
            "Outbox closed, draining sinks"
        );

        let metrics = Self::shutdown_handles(self.handles).await;

        info!("All sinks drained");
        metrics
    }

    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    fn dispatch(&self, snapshot: &OutgoingSnapshot) {
        for handle in &self.handles {
            handle.try_send(snapshot.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) -> Vec<(String, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = handle.name().to_string();
            let counters = handle.metrics().clone();
            handle.shutdown().await;
            metrics.push((name, counters.snapshot()));
        }
        metrics
    }
}

/// Open the sinks of a blueprint and attach them to `input_rx`
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<OutgoingSnapshot>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::snapshot;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ];

        let handle = Dispatcher::with_handles(handles, input_rx).spawn();

        for i in 0..5 {
            input_tx.send(snapshot(i)).await.unwrap();
        }
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.len(), 2);
        for (_, sink) in metrics {
            assert_eq!(sink.write_count, 5);
            assert_eq!(sink.dropped_count, 0);
        }
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![SinkConfig {
            name: "console".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(configs, input_rx).await.unwrap();
        assert_eq!(dispatcher.sink_count(), 1);
        let handle = dispatcher.spawn();

        input_tx.send(snapshot(1)).await.unwrap();
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics[0].0, "console");
        assert_eq!(metrics[0].1.write_count, 1);
    }

    #[tokio::test]
    async fn test_create_dispatcher_rejects_bad_sink() {
        let (_input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 10,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "udp".to_string(),
                sink_type: SinkType::Network,
                queue_capacity: 10,
                params: HashMap::from([("addr".to_string(), "not an address".to_string())]),
            },
        ];

        let result = create_dispatcher(configs, input_rx).await;
        assert!(matches!(
            result,
            Err(DispatcherError::SinkCreation { ref name, .. }) if name == "udp"
        ));
    }
}
