//! Synthetic fallback values
//!
//! Channels that never produced live data in a session are filled from a
//! bounded random walk, advanced once per snapshot tick. ECG has no live
//! source and is always synthesized from a P-QRS-T template.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Simulation time advanced per tick
const TIME_STEP: f64 = 0.1;

const EDA_START: f32 = 0.8;
const EDA_FLOOR: f32 = 0.1;
const SKIN_TEMP_START: f32 = 33.5;
const SKIN_TEMP_RANGE: (f32, f32) = (30.0, 36.5);
const HEART_RATE_START: f64 = 72.0;
const HEART_RATE_RANGE: (f64, f64) = (50.0, 110.0);
const ACC_LIMIT: i32 = 4096;
const FALLBACK_ECG_BPM: i32 = 72;

/// One tick's worth of synthetic channel values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedValues {
    pub time_step: f64,
    pub heart_rate: i32,
    pub ppg_green: i32,
    pub ppg_red: i32,
    pub ppg_ir: i32,
    pub acc_x: i32,
    pub acc_y: i32,
    pub acc_z: i32,
    pub skin_temperature: f32,
    pub eda: f32,
}

#[derive(Debug)]
pub struct SimulationState {
    rng: StdRng,
    time_step: f64,
    eda: f32,
    skin_temperature: f32,
    heart_rate: f64,
    acc: [i32; 3],
}

impl SimulationState {
    /// Fixed seed for reproducible output, OS entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let eda = EDA_START + rng.random_range(-0.05..0.05);
        Self {
            rng,
            time_step: 0.0,
            eda,
            skin_temperature: SKIN_TEMP_START,
            heart_rate: HEART_RATE_START,
            acc: [0, 0, 1000],
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Move every walk one step and return the new values
    pub fn advance(&mut self) -> SimulatedValues {
        self.time_step += TIME_STEP;

        self.eda = (self.eda + self.rng.random_range(-0.005..0.005)).max(EDA_FLOOR);
        self.skin_temperature = (self.skin_temperature + self.rng.random_range(-0.01..0.01))
            .clamp(SKIN_TEMP_RANGE.0, SKIN_TEMP_RANGE.1);
        self.heart_rate = (self.heart_rate + self.rng.random_range(-0.5..0.5))
            .clamp(HEART_RATE_RANGE.0, HEART_RATE_RANGE.1);
        for axis in &mut self.acc {
            *axis = (*axis + self.rng.random_range(-5..=5)).clamp(-ACC_LIMIT, ACC_LIMIT);
        }

        let heart_rate = self.heart_rate.round() as i32;
        let phase = beat_phase(self.time_step, heart_rate);
        let pulse = (-(phase - 0.2).powi(2) / 0.005).exp();
        let mut ppg = |base: f64, amplitude: f64| {
            let noise: f64 = self.rng.random_range(-5.0..5.0);
            (base + amplitude * pulse + noise).round().max(0.0) as i32
        };
        let ppg_green = ppg(1000.0, 40.0);
        let ppg_red = ppg(2000.0, 20.0);
        let ppg_ir = ppg(1500.0, 25.0);

        SimulatedValues {
            time_step: self.time_step,
            heart_rate,
            ppg_green,
            ppg_red,
            ppg_ir,
            acc_x: self.acc[0],
            acc_y: self.acc[1],
            acc_z: self.acc[2],
            skin_temperature: self.skin_temperature,
            eda: self.eda,
        }
    }

    /// ECG sample at the current time step for a given heart rate
    pub fn ecg_sample(&mut self, heart_rate: i32) -> f32 {
        let noise = self.rng.random_range(-5.0..5.0);
        ecg_template(beat_phase(self.time_step, heart_rate)) + noise
    }
}

/// Position within the current beat, 0..1
fn beat_phase(time: f64, heart_rate: i32) -> f64 {
    let bpm = if heart_rate > 0 {
        heart_rate
    } else {
        FALLBACK_ECG_BPM
    };
    let period = 60.0 / bpm as f64;
    (time % period) / period
}

/// Noise-free P-QRS-T waveform over one normalized beat
pub fn ecg_template(t: f64) -> f32 {
    let mut ecg = 0.0;

    // P wave
    if (0.1..=0.18).contains(&t) {
        ecg += 150.0 * (((t - 0.14) / 0.04) * PI).sin();
    }
    // Q dip
    if (0.25..=0.27).contains(&t) {
        ecg -= 400.0 * (-(t - 0.26).powi(2) / 0.0001).exp();
    }
    // R spike
    if (0.28..=0.31).contains(&t) {
        ecg += 1000.0 * (-(t - 0.295).powi(2) / 0.00002).exp();
    }
    // S dip
    if (0.32..=0.35).contains(&t) {
        ecg -= 300.0 * (-(t - 0.34).powi(2) / 0.00005).exp();
    }
    // T wave
    if (0.45..=0.6).contains(&t) {
        ecg += 250.0 * (((t - 0.45) / 0.15) * PI).sin();
    }

    ecg as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_simulation_is_deterministic() {
        let mut a = SimulationState::new(Some(7));
        let mut b = SimulationState::new(Some(7));
        for _ in 0..50 {
            assert_eq!(a.advance(), b.advance());
            assert_eq!(a.ecg_sample(72), b.ecg_sample(72));
        }
    }

    #[test]
    fn test_walks_stay_in_bounds() {
        let mut sim = SimulationState::new(Some(1));
        for _ in 0..20_000 {
            let v = sim.advance();
            assert!(v.eda >= EDA_FLOOR, "eda={}", v.eda);
            assert!((30.0..=36.5).contains(&v.skin_temperature));
            assert!((50..=110).contains(&v.heart_rate));
            for axis in [v.acc_x, v.acc_y, v.acc_z] {
                assert!((-ACC_LIMIT..=ACC_LIMIT).contains(&axis));
            }
            assert!(v.ppg_green >= 0 && v.ppg_red >= 0 && v.ppg_ir >= 0);
        }
    }

    #[test]
    fn test_initial_values() {
        let mut sim = SimulationState::new(Some(3));
        let v = sim.advance();
        assert!((0.74..=0.86).contains(&v.eda), "eda={}", v.eda);
        assert!((v.skin_temperature - 33.5).abs() <= 0.011);
        assert!((v.time_step - 0.1).abs() < 1e-12);
        assert!((900..=1100).contains(&v.ppg_green));
    }

    #[test]
    fn test_ecg_template_shape() {
        // R peak dominates, baseline is flat
        assert!((ecg_template(0.295) - 1000.0).abs() < 1e-3);
        assert_eq!(ecg_template(0.0), 0.0);
        assert_eq!(ecg_template(0.9), 0.0);
        assert!(ecg_template(0.26) < -300.0);
        assert!(ecg_template(0.525) > 200.0);
    }

    #[test]
    fn test_ecg_zero_heart_rate_uses_fallback() {
        assert_eq!(beat_phase(0.5, 0), beat_phase(0.5, 72));
        assert_eq!(beat_phase(0.5, -3), beat_phase(0.5, 72));
    }
}
