//! Applies decoded samples to the shared session state

use std::sync::Arc;

use async_channel::Receiver;
use contracts::{SensorSample, TimedSample, ValueKey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::state::SharedState;

/// Sample sink feeding the record store and the sliding windows
#[derive(Debug, Clone)]
pub struct SampleIngest {
    state: Arc<SharedState>,
}

impl SampleIngest {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }

    pub fn on_sample(&self, sample: &SensorSample, now_ms: i64) {
        match sample {
            SensorSample::Ppg { green, red, ir } => {
                self.state.windows.push_ppg(*green, *red, *ir);
                self.state.latest.update(|record| {
                    record.ppg_green = Some(green.round() as i32);
                    record.ppg_red = Some(red.round() as i32);
                    record.ppg_ir = Some(ir.round() as i32);
                    record.touch(ValueKey::PpgGreen, now_ms);
                    record.touch(ValueKey::PpgRed, now_ms);
                    record.touch(ValueKey::PpgIr, now_ms);
                });
            }
            SensorSample::HeartRate { bpm, ibi } => {
                self.state.windows.push_heart_rate(f64::from(*bpm));
                self.state.latest.update(|record| {
                    record.heart_rate = Some(*bpm);
                    record.touch(ValueKey::HeartRate, now_ms);
                    // A reading without IBI keeps the previous list
                    if let Some(ibi) = ibi {
                        record.ibi = Some(ibi.clone());
                        record.touch(ValueKey::IbiList, now_ms);
                    }
                });
                metrics::gauge!("biosync_heart_rate_bpm").set(f64::from(*bpm));
                trace!(bpm, "heart rate received");
            }
            SensorSample::Accelerometer { x, y, z } => {
                self.state.latest.update(|record| {
                    record.acc_x = Some(*x);
                    record.acc_y = Some(*y);
                    record.acc_z = Some(*z);
                    record.touch(ValueKey::AccelerometerX, now_ms);
                    record.touch(ValueKey::AccelerometerY, now_ms);
                    record.touch(ValueKey::AccelerometerZ, now_ms);
                });
            }
            SensorSample::SkinTemperature { celsius } => {
                self.state.latest.update(|record| {
                    record.skin_temperature = Some(*celsius);
                    record.touch(ValueKey::ObjectTemperature, now_ms);
                });
            }
            SensorSample::Eda { microsiemens } => {
                self.state.latest.update(|record| {
                    record.eda = Some(*microsiemens);
                    record.touch(ValueKey::SkinConductance, now_ms);
                });
            }
        }
    }

    pub fn on_timed(&self, timed: &TimedSample) {
        self.on_sample(&timed.sample, timed.received_at_ms);
    }
}

/// Drain the ingestion stream into the state until cancelled or the
/// stream closes.
#[instrument(name = "signal_engine_ingest_loop", skip_all)]
pub async fn run_ingest_loop(
    ingest: SampleIngest,
    rx: Receiver<TimedSample>,
    token: CancellationToken,
) {
    info!("ingest loop started");
    let mut applied: u64 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = rx.recv() => match received {
                Ok(timed) => {
                    ingest.on_timed(&timed);
                    applied += 1;
                }
                Err(_) => {
                    debug!("ingestion stream closed");
                    break;
                }
            }
        }
    }

    info!(applied, "ingest loop stopped");
}
