//! Slow cadence: derived metrics from the sliding windows

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Clock, DerivedMetrics, WindowConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::dsp;
use crate::error::MetricError;
use crate::state::SharedState;
use crate::windows::SignalWindows;

/// Computes one generation of [`DerivedMetrics`] from window copies
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    ppg_min_samples: usize,
    min_hr_samples: usize,
    hr_sample_rate_hz: f64,
    respiration_band_hz: [f64; 2],
}

impl MetricsCalculator {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            ppg_min_samples: config.ppg_min_samples(),
            min_hr_samples: config.min_hr_samples,
            hr_sample_rate_hz: config.hr_sample_rate_hz,
            respiration_band_hz: config.respiration_band_hz,
        }
    }

    /// Compute every metric whose window is full enough.
    ///
    /// Windows are copied first; no lock is held while computing.
    pub fn compute(&self, windows: &SignalWindows, now_ms: i64) -> DerivedMetrics {
        let ppg = windows.snapshot_ppg();
        let heart_rate = windows.snapshot_heart_rate();

        let ppg_ready = Self::require(ppg.len(), self.ppg_min_samples);
        let bvp = evaluate(
            "bvp",
            ppg_ready
                .clone()
                .and_then(|_| dsp::bvp(&ppg.green)),
        );
        let spo2 = evaluate("spo2", ppg_ready.and_then(|_| dsp::spo2(&ppg.red, &ppg.ir)));
        let respiration_rate = evaluate(
            "respiration_rate",
            Self::require(heart_rate.len(), self.min_hr_samples).and_then(|_| {
                dsp::respiration_rate(
                    &heart_rate,
                    self.hr_sample_rate_hz,
                    self.respiration_band_hz,
                )
            }),
        );

        DerivedMetrics {
            bvp,
            spo2,
            respiration_rate,
            computed_at_ms: Some(now_ms),
        }
    }

    fn require(have: usize, need: usize) -> Result<(), MetricError> {
        if have < need {
            Err(MetricError::InsufficientSamples { have, need })
        } else {
            Ok(())
        }
    }
}

/// Degrade a failed metric to `None` for this generation
fn evaluate<T>(metric: &'static str, result: Result<T, MetricError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        // Warm-up, not a failure
        Err(MetricError::InsufficientSamples { have, need }) => {
            debug!(metric, have, need, "window not full enough yet");
            None
        }
        Err(e) => {
            debug!(metric, error = %e, "metric unavailable this tick");
            metrics::counter!("biosync_metric_failures_total", "metric" => metric, "reason" => e.kind())
                .increment(1);
            None
        }
    }
}

/// Sleep, compute, publish, until cancelled.
#[instrument(
    name = "signal_engine_processing_loop",
    skip(state, calculator, clock, token),
    fields(interval_ms = interval.as_millis() as u64)
)]
pub async fn run_processing_loop(
    state: Arc<SharedState>,
    calculator: MetricsCalculator,
    clock: Arc<dyn Clock>,
    interval: Duration,
    token: CancellationToken,
) {
    info!("processing loop started");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let started = Instant::now();
        let derived = calculator.compute(&state.windows, clock.now_ms());
        state.derived.store(derived);

        metrics::histogram!("biosync_processing_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if let Some(spo2) = derived.spo2 {
            metrics::gauge!("biosync_spo2_percent").set(spo2 as f64);
        }
        if let Some(rate) = derived.respiration_rate {
            metrics::gauge!("biosync_respiration_rate_bpm").set(rate);
        }
        let fill = state.windows.fill();
        metrics::gauge!("biosync_window_fill", "window" => "ppg").set(fill.ppg as f64);
        metrics::gauge!("biosync_window_fill", "window" => "heart_rate").set(fill.heart_rate as f64);

        debug!(
            bvp = ?derived.bvp,
            spo2 = ?derived.spo2,
            respiration_rate = ?derived.respiration_rate,
            ppg_fill = fill.ppg,
            hr_fill = fill.heart_rate,
            "derived metrics updated"
        );
    }

    info!("processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;
    use std::f64::consts::PI;

    fn fill_ppg(windows: &SignalWindows, count: usize) {
        for i in 0..count {
            let pulse = (2.0 * PI * i as f64 / 25.0).sin();
            windows.push_ppg(1000.0 + 40.0 * pulse, 2000.0 + 20.0 * pulse, 1500.0 + 25.0 * pulse);
        }
    }

    #[test]
    fn test_below_threshold_metrics_absent() {
        let config = WindowConfig::default();
        let windows = SignalWindows::new(&config);
        fill_ppg(&windows, 99);
        for _ in 0..29 {
            windows.push_heart_rate(70.0);
        }

        let derived = MetricsCalculator::new(&config).compute(&windows, 5);
        assert_eq!(derived.bvp, None);
        assert_eq!(derived.spo2, None);
        assert_eq!(derived.respiration_rate, None);
        assert_eq!(derived.computed_at_ms, Some(5));
    }

    #[test]
    fn test_full_windows_produce_metrics() {
        let config = WindowConfig::default();
        let windows = SignalWindows::new(&config);
        fill_ppg(&windows, 100);
        for i in 0..120 {
            windows.push_heart_rate(70.0 + 4.0 * (2.0 * PI * 0.2 * i as f64).sin());
        }

        let derived = MetricsCalculator::new(&config).compute(&windows, 0);
        assert!(derived.bvp.is_some());
        let spo2 = derived.spo2.unwrap();
        assert!((0.0..=100.0).contains(&spo2));
        let rate = derived.respiration_rate.unwrap();
        assert!((rate - 12.0).abs() <= 1.0, "rate={rate}");
    }

    #[test]
    fn test_failed_metric_does_not_hide_others() {
        let config = WindowConfig::default();
        let windows = SignalWindows::new(&config);
        // Flat IR: SpO2 fails, BVP still computed
        for i in 0..100 {
            windows.push_ppg(1000.0 + (i % 7) as f64, 2000.0 + (i % 3) as f64, 1500.0);
        }

        let derived = MetricsCalculator::new(&config).compute(&windows, 0);
        assert!(derived.bvp.is_some());
        assert_eq!(derived.spo2, None);
    }

    #[tokio::test]
    async fn test_processing_loop_publishes_and_stops() {
        let config = WindowConfig::default();
        let state = Arc::new(SharedState::new(&config));
        fill_ppg(&state.windows, 125);

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_processing_loop(
            state.clone(),
            MetricsCalculator::new(&config),
            Arc::new(ManualClock::new(42)),
            Duration::from_millis(10),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        handle.await.unwrap();

        let derived = state.derived.load();
        assert_eq!(derived.computed_at_ms, Some(42));
        assert!(derived.spo2.is_some());
    }

    #[tokio::test]
    async fn test_processing_loop_cancels_while_sleeping() {
        let state = Arc::new(SharedState::new(&WindowConfig::default()));
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_processing_loop(
            state.clone(),
            MetricsCalculator::new(&WindowConfig::default()),
            Arc::new(ManualClock::default()),
            Duration::from_secs(3600),
            token.clone(),
        ));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.derived.load().computed_at_ms, None);
    }
}
