//! Adapter common utility functions

use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{ChannelKind, TimedSample};
use tracing::{trace, warn};

use crate::config::{DropPolicy, IngestionMetrics};

/// Shared sample channel handed to every adapter.
///
/// Holds a receiver clone so `DropOldest` can evict the head of the queue.
#[derive(Clone)]
pub struct SampleOutlet {
    tx: Sender<TimedSample>,
    rx: Receiver<TimedSample>,
}

impl SampleOutlet {
    pub fn new(tx: Sender<TimedSample>, rx: Receiver<TimedSample>) -> Self {
        Self { tx, rx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send sample, handling backpressure policy
    pub fn send(
        &self,
        sample: TimedSample,
        metrics: &Arc<IngestionMetrics>,
        channel: ChannelKind,
        drop_policy: DropPolicy,
    ) {
        let result = match self.tx.try_send(sample) {
            Err(TrySendError::Full(sample)) if drop_policy == DropPolicy::DropOldest => {
                // Another producer may refill the slot; then the new sample is dropped
                if self.rx.try_recv().is_ok() {
                    metrics.record_dropped();
                    trace!(channel = %channel, "sample dropped (oldest)");
                }
                self.tx.try_send(sample)
            }
            other => other,
        };

        match result {
            Ok(()) => {
                metrics.record_forwarded();
                metrics.update_queue_len(self.tx.len());
                metrics::counter!("biosync_samples_received_total", "channel" => channel.as_str())
                    .increment(1);
            }
            Err(TrySendError::Full(_)) => {
                metrics.record_dropped();
                metrics::counter!("biosync_samples_dropped_total", "channel" => channel.as_str())
                    .increment(1);
                trace!(channel = %channel, "sample dropped (newest)");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(channel = %channel, "sample channel closed");
            }
        }
    }
}
