//! Mock watch sensor
//!
//! Implements `SensorSource`, generating plausible wrist-worn sensor data
//! in a background thread. Used for development without a device.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{
    default_rate_hz, ChannelKind, DataPoint, DataValue, SensorDataCallback, SensorSource,
    SourceConfig, ValueKey,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockWatchConfig {
    /// Data points per second
    pub rate_hz: f64,
    /// Data points per callback
    pub batch_size: usize,
    /// Resting heart rate of the synthetic wearer
    pub heart_rate_bpm: f64,
    /// Breathing rate modulating heart rate (respiratory sinus arrhythmia)
    pub breaths_per_minute: f64,
    /// Every N-th point is malformed (0 disables)
    pub decode_error_every: u64,
    pub seed: Option<u64>,
}

impl MockWatchConfig {
    pub fn for_channel(channel: ChannelKind, source: &SourceConfig) -> Self {
        Self {
            rate_hz: source.rate_for(channel),
            batch_size: source.batch_size.max(1),
            heart_rate_bpm: source.heart_rate_bpm,
            breaths_per_minute: source.breaths_per_minute,
            decode_error_every: source.decode_error_every,
            seed: source.seed,
        }
    }
}

impl Default for MockWatchConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(ChannelKind::Ppg),
            batch_size: 1,
            heart_rate_bpm: 68.0,
            breaths_per_minute: 12.0,
            decode_error_every: 0,
            seed: None,
        }
    }
}

/// Mock watch sensor for a single channel
pub struct MockWatchSensor {
    channel: ChannelKind,
    config: MockWatchConfig,
    listening: Arc<AtomicBool>,
}

impl MockWatchSensor {
    pub fn new(channel: ChannelKind, config: MockWatchConfig) -> Self {
        Self {
            channel,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create mock sensor at the channel's native rate
    pub fn with_defaults(channel: ChannelKind) -> Self {
        Self::new(
            channel,
            MockWatchConfig {
                rate_hz: default_rate_hz(channel),
                ..MockWatchConfig::default()
            },
        )
    }
}

/// Per-thread waveform state
struct Waveform {
    channel: ChannelKind,
    config: MockWatchConfig,
    rng: StdRng,
    index: u64,
    skin_temperature: f64,
    eda: f64,
}

impl Waveform {
    fn new(channel: ChannelKind, config: MockWatchConfig) -> Self {
        // Offset the seed per channel so channels don't share a noise sequence
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ (channel as u64 + 1) * 0x9E37_79B9),
            None => StdRng::from_os_rng(),
        };
        Self {
            channel,
            config,
            rng,
            index: 0,
            skin_temperature: 33.2,
            eda: 0.9,
        }
    }

    fn elapsed_s(&self) -> f64 {
        self.index as f64 / self.config.rate_hz
    }

    fn heart_rate(&self, t: f64) -> f64 {
        let breath_hz = self.config.breaths_per_minute / 60.0;
        self.config.heart_rate_bpm + 4.0 * (2.0 * PI * breath_hz * t).sin()
    }

    fn next_point(&mut self, timestamp_ms: i64) -> DataPoint {
        self.index += 1;
        let t = self.elapsed_s();
        let point = DataPoint::new(timestamp_ms);

        let every = self.config.decode_error_every;
        if every > 0 && self.index % every == 0 {
            // Malformed: first key only, wrong type
            let key = self.channel.value_keys()[0];
            return point.with(key, DataValue::IntList(Vec::new()));
        }

        match self.channel {
            ChannelKind::Ppg => {
                let beat_phase = (t * self.heart_rate(t) / 60.0).fract();
                let pulse = (-(beat_phase - 0.2).powi(2) / 0.005).exp();
                let mut noisy = |base: f64, amplitude: f64| {
                    let noise: f64 = self.rng.random_range(-5.0..5.0);
                    DataValue::Int((base + amplitude * pulse + noise).round() as i64)
                };
                let green = noisy(1000.0, 40.0);
                let red = noisy(2000.0, 20.0);
                let ir = noisy(1500.0, 25.0);
                point
                    .with(ValueKey::PpgGreen, green)
                    .with(ValueKey::PpgRed, red)
                    .with(ValueKey::PpgIr, ir)
            }
            ChannelKind::HeartRate => {
                let noise: f64 = self.rng.random_range(-0.5..0.5);
                let bpm = (self.heart_rate(t) + noise).round().max(1.0);
                let ibi = (60_000.0 / bpm).round() as i32;
                point
                    .with(ValueKey::HeartRate, DataValue::Int(bpm as i64))
                    .with(ValueKey::IbiList, DataValue::IntList(vec![ibi]))
            }
            ChannelKind::Accelerometer => {
                let sway = (2.0 * PI * 0.3 * t).sin();
                let mut axis = |base: f64| {
                    let noise: f64 = self.rng.random_range(-20.0..20.0);
                    DataValue::Int((base + 60.0 * sway + noise).round() as i64)
                };
                let x = axis(-120.0);
                let y = axis(80.0);
                let z = axis(4000.0);
                point
                    .with(ValueKey::AccelerometerX, x)
                    .with(ValueKey::AccelerometerY, y)
                    .with(ValueKey::AccelerometerZ, z)
            }
            ChannelKind::SkinTemperature => {
                self.skin_temperature =
                    (self.skin_temperature + self.rng.random_range(-0.02..0.02)).clamp(31.0, 35.5);
                point.with(
                    ValueKey::ObjectTemperature,
                    DataValue::Float(self.skin_temperature),
                )
            }
            ChannelKind::Eda => {
                self.eda = (self.eda + self.rng.random_range(-0.01..0.01)).max(0.1);
                point.with(ValueKey::SkinConductance, DataValue::Float(self.eda))
            }
        }
    }
}

impl SensorSource for MockWatchSensor {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let channel = self.channel;
        let config = self.config.clone();
        let listening = self.listening.clone();
        let batch_size = config.batch_size.max(1);
        let interval = Duration::from_secs_f64(batch_size as f64 / config.rate_hz);

        thread::spawn(move || {
            let mut waveform = Waveform::new(channel, config);

            debug!(
                channel = %channel,
                rate_hz = waveform.config.rate_hz,
                batch_size,
                "mock watch sensor started"
            );

            while listening.load(Ordering::Relaxed) {
                let now_ms = chrono::Utc::now().timestamp_millis();
                let step_ms = (1000.0 / waveform.config.rate_hz) as i64;
                let batch: Vec<DataPoint> = (0..batch_size)
                    .map(|i| {
                        let offset = (batch_size - 1 - i) as i64 * step_ms;
                        waveform.next_point(now_ms - offset)
                    })
                    .collect();

                callback(batch);

                trace!(channel = %channel, index = waveform.index, "mock batch sent");

                thread::sleep(interval);
            }

            debug!(channel = %channel, "mock watch sensor stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    #[test]
    fn test_mock_ppg_points_carry_all_leds() {
        let sensor = MockWatchSensor::new(
            ChannelKind::Ppg,
            MockWatchConfig {
                rate_hz: 200.0,
                seed: Some(1),
                ..Default::default()
            },
        );

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        sensor.listen(Arc::new(move |batch| {
            sink.lock().unwrap().extend(batch);
        }));

        thread::sleep(Duration::from_millis(60));
        sensor.stop();

        let points = received.lock().unwrap();
        assert!(!points.is_empty());
        for point in points.iter() {
            let green = point.get_f64(ValueKey::PpgGreen).unwrap();
            assert!((900.0..1100.0).contains(&green), "green={green}");
            assert!(point.contains(ValueKey::PpgRed));
            assert!(point.contains(ValueKey::PpgIr));
        }
        assert!(!sensor.is_listening());
    }

    #[test]
    fn test_mock_heart_rate_has_ibi() {
        let mut waveform = Waveform::new(
            ChannelKind::HeartRate,
            MockWatchConfig {
                rate_hz: 1.0,
                seed: Some(3),
                ..Default::default()
            },
        );
        let point = waveform.next_point(0);
        let bpm = point.get_i64(ValueKey::HeartRate).unwrap();
        assert!((60..=80).contains(&bpm), "bpm={bpm}");
        let ibi = point.get_int_list(ValueKey::IbiList).unwrap();
        assert_eq!(ibi.len(), 1);
    }

    #[test]
    fn test_decode_error_injection() {
        let mut waveform = Waveform::new(
            ChannelKind::Eda,
            MockWatchConfig {
                decode_error_every: 2,
                seed: Some(5),
                ..Default::default()
            },
        );
        let good = waveform.next_point(0);
        let bad = waveform.next_point(1);
        assert!(good.get_f64(ValueKey::SkinConductance).is_some());
        assert!(bad.get_f64(ValueKey::SkinConductance).is_none());
    }

    #[test]
    fn test_seeded_waveform_is_reproducible() {
        let config = MockWatchConfig {
            seed: Some(11),
            ..Default::default()
        };
        let mut a = Waveform::new(ChannelKind::Ppg, config.clone());
        let mut b = Waveform::new(ChannelKind::Ppg, config);
        for i in 0..10 {
            assert_eq!(a.next_point(i), b.next_point(i));
        }
    }

    #[test]
    fn test_mock_sensor_idempotent_listen() {
        let sensor = MockWatchSensor::new(
            ChannelKind::Eda,
            MockWatchConfig {
                rate_hz: 100.0,
                ..Default::default()
            },
        );

        let count = Arc::new(AtomicU64::new(0));
        let count1 = count.clone();
        let count2 = count.clone();

        sensor.listen(Arc::new(move |_| {
            count1.fetch_add(1, Ordering::Relaxed);
        }));
        // Second call should be ignored
        sensor.listen(Arc::new(move |_| {
            count2.fetch_add(1000, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(50));
        sensor.stop();

        let final_count = count.load(Ordering::Relaxed);
        assert!(final_count > 0);
        assert!(final_count < 1000);
    }
}
