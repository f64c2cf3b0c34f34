//! Channel subscription
//!
//! Subscribes a session's channel set against a tracking service. A channel
//! that fails to subscribe is recorded and skipped; the rest of the set
//! still comes up.

use contracts::{ChannelKind, ContractError, SensorSource, TrackingService};
use tracing::{info, instrument, warn};

/// A channel the service refused, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableChannel {
    pub channel: ChannelKind,
    pub reason: String,
}

/// Result of subscribing a channel set
pub struct Subscription {
    pub sources: Vec<Box<dyn SensorSource>>,
    pub unavailable: Vec<UnavailableChannel>,
}

impl Subscription {
    pub fn subscribed_channels(&self) -> Vec<ChannelKind> {
        self.sources.iter().map(|source| source.channel()).collect()
    }
}

/// Subscribe every requested channel
///
/// # Errors
/// Only when the service connection itself is unavailable; per-channel
/// failures are reported in [`Subscription::unavailable`].
#[instrument(
    name = "tracking_subscribe_channels",
    skip(service, channels),
    fields(requested = channels.len())
)]
pub fn subscribe_channels<S>(
    service: &S,
    channels: &[ChannelKind],
) -> Result<Subscription, ContractError>
where
    S: TrackingService + ?Sized,
{
    service.ensure_connected()?;

    let mut sources = Vec::with_capacity(channels.len());
    let mut unavailable = Vec::new();

    for &channel in channels {
        match service.tracker(channel) {
            Ok(source) => sources.push(source),
            // Connection lost mid-subscribe: tear down what we have
            Err(e @ ContractError::TrackingUnavailable { .. }) => {
                for source in &sources {
                    source.stop();
                }
                return Err(e);
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "channel unavailable, routing to simulation");
                unavailable.push(UnavailableChannel {
                    channel,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        subscribed = sources.len(),
        unavailable = unavailable.len(),
        "channel subscription completed"
    );

    Ok(Subscription {
        sources,
        unavailable,
    })
}
