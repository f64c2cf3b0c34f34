//! Pipeline statistics.

use std::fmt;
use std::time::Duration;

use contracts::{ChannelKind, OutgoingSnapshot};
use observability::SnapshotStatsAggregator;

/// Why the forwarding loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Signal,
    Duration,
    MaxSnapshots,
    OutboxClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StopReason::Signal => "shutdown signal",
            StopReason::Duration => "duration elapsed",
            StopReason::MaxSnapshots => "snapshot limit",
            StopReason::OutboxClosed => "outbox closed",
        };
        f.write_str(reason)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Snapshots handed to the dispatcher
    pub snapshots_forwarded: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    pub subscribed: Vec<ChannelKind>,

    /// Channels the service refused; simulated for the whole run
    pub unavailable: Vec<ChannelKind>,

    pub active_sinks: usize,

    pub stop_reason: Option<StopReason>,

    /// Ingestion counters captured just before the session stopped
    pub ingestion: Option<ingestion::MetricsSnapshot>,

    /// Final per-sink counters
    pub sink_metrics: Vec<(String, dispatcher::MetricsSnapshot)>,

    /// Vital sign aggregates over forwarded snapshots
    pub snapshot_stats: SnapshotStatsAggregator,
}

impl PipelineStats {
    pub fn record(&mut self, snapshot: &OutgoingSnapshot) {
        self.snapshots_forwarded += 1;
        self.snapshot_stats.update(snapshot);
    }

    /// Snapshots per second
    pub fn snapshot_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.snapshots_forwarded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of decoded samples lost to backpressure, as percentage
    pub fn sample_drop_rate(&self) -> f64 {
        match &self.ingestion {
            Some(m) if m.samples_forwarded + m.samples_dropped > 0 => {
                m.samples_dropped as f64 / (m.samples_forwarded + m.samples_dropped) as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        if let Some(reason) = self.stop_reason {
            println!("   ├─ Stopped by: {}", reason);
        }
        println!("   ├─ Snapshots forwarded: {}", self.snapshots_forwarded);
        println!("   ├─ Rate: {:.2}/s", self.snapshot_rate());
        println!("   ├─ Subscribed channels: {}", join(&self.subscribed));
        println!("   ├─ Simulated channels: {}", join(&self.unavailable));
        println!("   └─ Active sinks: {}", self.active_sinks);

        if let Some(ingestion) = &self.ingestion {
            println!("\n📥 Ingestion");
            println!("   ├─ Data points received: {}", ingestion.points_received);
            println!("   ├─ Samples forwarded: {}", ingestion.samples_forwarded);
            println!(
                "   ├─ Samples dropped: {} ({:.2}%)",
                ingestion.samples_dropped,
                self.sample_drop_rate()
            );
            println!("   └─ Decode errors: {}", ingestion.decode_errors);
        }

        let summary = self.snapshot_stats.summary();
        println!("\n❤️  Vital Signs");
        println!("   ├─ Heart rate (bpm): {}", summary.heart_rate);
        println!(
            "   ├─ SpO2 (%): {} [present {:.1}%]",
            summary.spo2, summary.spo2_coverage
        );
        println!(
            "   └─ Respiration (br/min): {} [present {:.1}%]",
            summary.respiration, summary.respiration_coverage
        );

        if !self.sink_metrics.is_empty() {
            println!("\n📤 Sinks");
            let last = self.sink_metrics.len() - 1;
            for (i, (name, m)) in self.sink_metrics.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: written={}, failed={}, dropped={}",
                    prefix, name, m.write_count, m.failure_count, m.dropped_count
                );
            }
        }

        println!();
    }
}

fn join(channels: &[ChannelKind]) -> String {
    if channels.is_empty() {
        return "none".to_string();
    }
    channels
        .iter()
        .map(ChannelKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
