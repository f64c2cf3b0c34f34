//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKind, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    source: String,
    channels: Vec<ChannelInfo>,
    timing: contracts::TimingConfig,
    windows: contracts::WindowConfig,
    simulation: contracts::SimulationConfig,
    sink_types: &'static [SinkTypeInfo],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: &'static str,
    subscribed: bool,
    available: bool,
    rate_hz: f64,
    fields: Vec<String>,
}

#[derive(Serialize)]
struct SinkTypeInfo {
    sink_type: &'static str,
    params: &'static str,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

static SINK_TYPES: [SinkTypeInfo; 3] = [
    SinkTypeInfo {
        sink_type: "log",
        params: "every (log every Nth snapshot, default 1)",
    },
    SinkTypeInfo {
        sink_type: "file",
        params: "path (JSON lines output, required), append (true/false)",
    },
    SinkTypeInfo {
        sink_type: "network",
        params: "addr (UDP host:port, required), format (json|bincode), max_packet_size",
    },
];

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let (blueprint, source) = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration info");
            (load_blueprint(path)?, path.display().to_string())
        }
        None => (SessionBlueprint::default(), "built-in defaults".to_string()),
    };

    let info = build_config_info(&blueprint, source);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &SessionBlueprint, source: String) -> ConfigInfo {
    let channels = ChannelKind::ALL
        .iter()
        .map(|&channel| ChannelInfo {
            name: channel.as_str(),
            subscribed: blueprint.session.channels.contains(&channel),
            available: !blueprint.source.unavailable.contains(&channel),
            rate_hz: blueprint.source.rate_for(channel),
            fields: channel
                .value_keys()
                .iter()
                .map(|key| format!("{:?}", key))
                .collect(),
        })
        .collect();

    ConfigInfo {
        source,
        channels,
        timing: blueprint.timing.clone(),
        windows: blueprint.windows.clone(),
        simulation: blueprint.simulation.clone(),
        sink_types: &SINK_TYPES,
        sinks: blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   biosync Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Source: {}\n", info.source);

    // Channels
    println!("📡 Channels ({})", info.channels.len());
    for (i, channel) in info.channels.iter().enumerate() {
        let prefix = if i == info.channels.len() - 1 { "└─" } else { "├─" };
        let state = match (channel.subscribed, channel.available) {
            (false, _) => "not subscribed",
            (true, false) => "simulated",
            (true, true) => "live",
        };
        println!(
            "   {} {} ({} Hz, {}) -> {}",
            prefix,
            channel.name,
            channel.rate_hz,
            state,
            channel.fields.join(", ")
        );
    }

    // Engine
    let timing = &info.timing;
    let windows = &info.windows;
    println!("\n⚙️  Engine");
    println!("   ├─ Snapshot interval: {} ms", timing.snapshot_interval_ms);
    println!("   ├─ Processing interval: {} ms", timing.processing_interval_ms);
    println!("   ├─ Stale threshold: {} ms", timing.stale_threshold_ms);
    println!(
        "   ├─ PPG window: {} samples (min fill {:.0}%)",
        windows.ppg_capacity,
        windows.ppg_min_fill_ratio * 100.0
    );
    println!(
        "   ├─ HR window: {} samples (min {}) at {} Hz",
        windows.hr_capacity, windows.min_hr_samples, windows.hr_sample_rate_hz
    );
    println!(
        "   ├─ Respiration band: {}-{} Hz",
        windows.respiration_band_hz[0], windows.respiration_band_hz[1]
    );
    println!(
        "   └─ Simulation: {} (seed {})",
        info.simulation.enabled,
        info.simulation
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "entropy".to_string())
    );

    // Sinks
    println!("\n📤 Sink types");
    for (i, sink_type) in info.sink_types.iter().enumerate() {
        let prefix = if i == info.sink_types.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, sink_type.sink_type, sink_type.params);
    }

    if !info.sinks.is_empty() {
        println!("\n📤 Configured sinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_info_lists_every_channel() {
        let info = build_config_info(&SessionBlueprint::default(), "defaults".to_string());
        assert_eq!(info.channels.len(), ChannelKind::ALL.len());
        assert!(info.channels.iter().all(|c| c.subscribed && c.available));

        let ppg = info.channels.iter().find(|c| c.name == "ppg").unwrap();
        assert_eq!(ppg.rate_hz, 25.0);
        assert_eq!(ppg.fields.len(), 3);
        assert_eq!(info.sink_types.len(), 3);
    }

    #[test]
    fn test_info_marks_unavailable_channels() {
        let mut blueprint = SessionBlueprint::default();
        blueprint.source.unavailable = vec![ChannelKind::Eda];

        let info = build_config_info(&blueprint, "test".to_string());
        let eda = info.channels.iter().find(|c| c.name == "eda").unwrap();
        assert!(!eda.available);
    }
}
