//! Manually fed sensor
//!
//! A `SensorSource` whose data points are pushed by the caller through a
//! [`ManualFeed`]. Delivery happens synchronously on the caller's thread,
//! which makes ingestion order deterministic in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ChannelKind, DataPoint, SensorDataCallback, SensorSource};
use tracing::trace;

#[derive(Default)]
struct FeedState {
    callback: Mutex<Option<SensorDataCallback>>,
    listening: AtomicBool,
}

/// Push side of a manual sensor
#[derive(Clone)]
pub struct ManualFeed {
    channel: ChannelKind,
    state: Arc<FeedState>,
}

impl ManualFeed {
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            state: Arc::new(FeedState::default()),
        }
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// Source half, handed to the ingestion pipeline
    pub fn sensor(&self) -> ManualSensor {
        ManualSensor { feed: self.clone() }
    }

    /// Deliver a batch. Returns false when nobody is listening.
    pub fn emit(&self, batch: Vec<DataPoint>) -> bool {
        if !self.state.listening.load(Ordering::SeqCst) {
            return false;
        }
        let callback = self
            .state
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                trace!(channel = %self.channel, points = batch.len(), "manual batch emitted");
                callback(batch);
                true
            }
            None => false,
        }
    }

    pub fn emit_one(&self, point: DataPoint) -> bool {
        self.emit(vec![point])
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening.load(Ordering::SeqCst)
    }
}

/// Pull side of a manual sensor
pub struct ManualSensor {
    feed: ManualFeed,
}

impl SensorSource for ManualSensor {
    fn channel(&self) -> ChannelKind {
        self.feed.channel
    }

    fn listen(&self, callback: SensorDataCallback) {
        if self.feed.state.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self
            .feed
            .state
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn stop(&self) {
        self.feed.state.listening.store(false, Ordering::SeqCst);
        self.feed
            .state
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_listening(&self) -> bool {
        self.feed.is_listening()
    }
}
