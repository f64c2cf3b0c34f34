//! 配置校验模块
//!
//! Rules:
//! - timing/window ranges (derived `validator` rules on the engine sections)
//! - min_hr_samples <= hr_capacity
//! - respiration band inside (0, Nyquist] of the heart-rate rate
//! - channel list non-empty and unique
//! - sink names unique, type-specific params present
//! - outbox and sink queues hold at least one snapshot

use std::collections::HashSet;

use contracts::{ContractError, SessionBlueprint, SinkType};
use ::validator::{Validate, ValidationErrors};

/// Validate a SessionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_section("timing", blueprint.timing.validate())?;
    validate_section("windows", blueprint.windows.validate())?;
    validate_windows(blueprint)?;
    validate_channels(blueprint)?;
    validate_source(blueprint)?;
    validate_sinks(blueprint)?;
    validate_outbox(blueprint)?;
    Ok(())
}

/// Non-fatal observations about a valid blueprint
pub fn warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.timing.snapshot_interval_ms > blueprint.timing.processing_interval_ms {
        warnings.push(format!(
            "snapshot_interval_ms ({}) exceeds processing_interval_ms ({}); derived metrics will refresh more often than they are emitted",
            blueprint.timing.snapshot_interval_ms, blueprint.timing.processing_interval_ms
        ));
    }

    if !blueprint.simulation.enabled && blueprint.simulation.seed.is_some() {
        warnings.push("simulation.seed is set but simulation is disabled".to_string());
    }

    if blueprint.sinks.is_empty() {
        warnings.push("no sinks configured; snapshots will be discarded".to_string());
    }

    let live: Vec<_> = blueprint.live_channels().collect();
    if live.is_empty() {
        warnings.push("every subscribed channel is marked unavailable".to_string());
    }

    warnings
}

/// Map derived-rule failures onto the first offending field
fn validate_section(
    section: &str,
    result: Result<(), ValidationErrors>,
) -> Result<(), ContractError> {
    let Err(errors) = result else {
        return Ok(());
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Err(ContractError::config_validation(
                format!("{section}.{field}"),
                format!("out of range: {message}"),
            ))
        }
        None => Err(ContractError::config_validation(section, errors.to_string())),
    }
}

fn validate_windows(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let windows = &blueprint.windows;

    if windows.min_hr_samples > windows.hr_capacity {
        return Err(ContractError::config_validation(
            "windows.min_hr_samples",
            format!(
                "min_hr_samples ({}) must be <= hr_capacity ({})",
                windows.min_hr_samples, windows.hr_capacity
            ),
        ));
    }

    let [low, high] = windows.respiration_band_hz;
    let nyquist = windows.hr_sample_rate_hz / 2.0;
    if !(low > 0.0 && low < high && high <= nyquist) {
        return Err(ContractError::config_validation(
            "windows.respiration_band_hz",
            format!("band [{low}, {high}] must satisfy 0 < low < high <= {nyquist}"),
        ));
    }

    Ok(())
}

fn validate_channels(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let channels = &blueprint.session.channels;
    if channels.is_empty() {
        return Err(ContractError::config_validation(
            "session.channels",
            "at least one channel must be subscribed",
        ));
    }

    let mut seen = HashSet::new();
    for channel in channels {
        if !seen.insert(channel) {
            return Err(ContractError::config_validation(
                format!("session.channels[{channel}]"),
                "duplicate channel",
            ));
        }
    }
    Ok(())
}

fn validate_source(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let source = &blueprint.source;

    if source.batch_size == 0 {
        return Err(ContractError::config_validation(
            "source.batch_size",
            "batch_size must be > 0",
        ));
    }

    for (channel, rate) in &source.rate_hz {
        if !(*rate > 0.0 && rate.is_finite()) {
            return Err(ContractError::config_validation(
                format!("source.rate_hz.{channel}"),
                format!("rate must be > 0, got {rate}"),
            ));
        }
    }

    if source.heart_rate_bpm <= 0.0 {
        return Err(ContractError::config_validation(
            "source.heart_rate_bpm",
            format!("heart_rate_bpm must be > 0, got {}", source.heart_rate_bpm),
        ));
    }

    Ok(())
}

fn validate_outbox(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if blueprint.outbox_capacity == 0 {
        return Err(ContractError::config_validation(
            "outbox_capacity",
            "outbox_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut names = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !names.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }

        let required = match sink.sink_type {
            SinkType::Log => None,
            SinkType::File => Some("path"),
            SinkType::Network => Some("addr"),
        };
        if let Some(param) = required {
            if !sink.params.contains_key(param) {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.{param}", sink.name),
                    format!("'{param}' is required for {:?} sinks", sink.sink_type),
                ));
            }
        }
    }
    Ok(())
}
