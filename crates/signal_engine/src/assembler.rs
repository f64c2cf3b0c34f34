//! Fast cadence: one composite snapshot per tick
//!
//! Every field is merged the same way:
//! - live value while it is fresh
//! - simulated value if the field was never observed this session
//! - type default once an observed field goes stale

use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, DerivedMetrics, LatestRecord, OutgoingSnapshot, ValueKey};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::simulation::SimulationState;
use crate::staleness::{is_off_wrist, Freshness, StalenessResolver};
use crate::state::SharedState;

#[derive(Debug)]
pub struct SnapshotAssembler {
    resolver: StalenessResolver,
    simulation: SimulationState,
    simulation_enabled: bool,
}

impl SnapshotAssembler {
    pub fn new(resolver: StalenessResolver, simulation: SimulationState, enabled: bool) -> Self {
        Self {
            resolver,
            simulation,
            simulation_enabled: enabled,
        }
    }

    /// Build the snapshot for `now_ms`, or `None` while off-wrist.
    ///
    /// The simulation only advances on ticks that produce a snapshot.
    pub fn assemble(
        &mut self,
        record: &LatestRecord,
        derived: &DerivedMetrics,
        now_ms: i64,
    ) -> Option<OutgoingSnapshot> {
        if is_off_wrist(record) {
            return None;
        }

        let simulated = self.simulation.advance();
        let sim = self.simulation_enabled.then_some(simulated);
        let merge = FieldMerge {
            resolver: &self.resolver,
            record,
            now_ms,
        };

        let hr = merge.value(ValueKey::HeartRate, record.heart_rate, sim.map(|s| s.heart_rate), 0);
        let ecg = self.simulation.ecg_sample(hr);

        Some(OutgoingSnapshot {
            timestamp: now_ms,
            acc_x: merge.value(ValueKey::AccelerometerX, record.acc_x, sim.map(|s| s.acc_x), 0),
            acc_y: merge.value(ValueKey::AccelerometerY, record.acc_y, sim.map(|s| s.acc_y), 0),
            acc_z: merge.value(ValueKey::AccelerometerZ, record.acc_z, sim.map(|s| s.acc_z), 0),
            ppg_green: merge.value(ValueKey::PpgGreen, record.ppg_green, sim.map(|s| s.ppg_green), 0),
            ppg_ir: merge.value(ValueKey::PpgIr, record.ppg_ir, sim.map(|s| s.ppg_ir), 0),
            ppg_red: merge.value(ValueKey::PpgRed, record.ppg_red, sim.map(|s| s.ppg_red), 0),
            hr,
            ibi: merge.value(ValueKey::IbiList, Some(record.ibi.clone()), None, None),
            skin_temp: merge.value(
                ValueKey::ObjectTemperature,
                record.skin_temperature,
                sim.map(|s| s.skin_temperature),
                0.0,
            ),
            eda: merge.value(ValueKey::SkinConductance, record.eda, sim.map(|s| s.eda), 0.0),
            ecg,
            spo2: derived.spo2,
            bvp: derived.bvp,
            respiration_rate: derived.respiration_rate,
        })
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.simulation
    }
}

struct FieldMerge<'a> {
    resolver: &'a StalenessResolver,
    record: &'a LatestRecord,
    now_ms: i64,
}

impl FieldMerge<'_> {
    fn value<T>(&self, key: ValueKey, live: Option<T>, simulated: Option<T>, default: T) -> T {
        match self.resolver.classify(self.record, key, self.now_ms) {
            Freshness::Live => live.unwrap_or(default),
            Freshness::Unobserved => simulated.unwrap_or(default),
            Freshness::Stale => default,
        }
    }
}

/// Hand a snapshot to the outbox without waiting.
///
/// Returns false when the outbox is full or closed; the snapshot is
/// dropped in both cases.
pub fn publish(outbox: &mpsc::Sender<OutgoingSnapshot>, snapshot: OutgoingSnapshot) -> bool {
    match outbox.try_send(snapshot) {
        Ok(()) => {
            metrics::counter!("biosync_snapshots_emitted_total").increment(1);
            true
        }
        Err(TrySendError::Full(_)) => {
            warn!("snapshot outbox full, dropping snapshot");
            metrics::counter!("biosync_snapshots_dropped_total", "reason" => "full").increment(1);
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("snapshot outbox closed, dropping snapshot");
            metrics::counter!("biosync_snapshots_dropped_total", "reason" => "closed").increment(1);
            false
        }
    }
}

/// Emit one snapshot per tick until cancelled
#[instrument(
    name = "signal_engine_snapshot_loop",
    skip(state, assembler, clock, outbox, token),
    fields(interval_ms = interval.as_millis() as u64)
)]
pub async fn run_snapshot_loop(
    state: Arc<SharedState>,
    mut assembler: SnapshotAssembler,
    clock: Arc<dyn Clock>,
    interval: Duration,
    outbox: mpsc::Sender<OutgoingSnapshot>,
    token: CancellationToken,
) {
    info!("snapshot loop started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut emitted: u64 = 0;
    let mut suppressed: u64 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let record = state.latest.snapshot();
        let derived = state.derived.load();
        let now_ms = clock.now_ms();

        match assembler.assemble(&record, &derived, now_ms) {
            Some(snapshot) => {
                if publish(&outbox, snapshot) {
                    emitted += 1;
                }
            }
            None => {
                suppressed += 1;
                debug!("off-wrist detected, snapshot suppressed");
                metrics::counter!("biosync_snapshots_suppressed_total", "reason" => "off_wrist")
                    .increment(1);
            }
        }
    }

    info!(emitted, suppressed, "snapshot loop stopped");
}
