//! Derived-metric algorithms
//!
//! Pure functions over point-in-time window copies. Every fallible metric
//! reports why it could not be computed; the calculator decides how to
//! degrade.

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::MetricError;

/// Remove the least-squares linear trend (value against sample index).
///
/// Returns the input unchanged when a trend can't be fitted (fewer than
/// two samples or a non-finite fit).
pub fn detrend(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return data.to_vec();
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = data.iter().sum::<f64>() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if sxx == 0.0 {
        return data.to_vec();
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return data.to_vec();
    }

    data.iter()
        .enumerate()
        .map(|(i, &y)| y - (slope * i as f64 + intercept))
        .collect()
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Root mean square; 0 for an empty series
pub fn rms(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
}

/// Blood volume pulse: latest detrended green sample
pub fn bvp(green: &[f64]) -> Result<f32, MetricError> {
    let value = detrend(green).last().copied().ok_or(MetricError::EmptySeries)?;
    if !value.is_finite() {
        return Err(MetricError::NonFinite("bvp"));
    }
    Ok(value as f32)
}

/// SpO2 by ratio of ratios: `110 - 25 * R`, clamped to 0..=100
pub fn spo2(red: &[f64], ir: &[f64]) -> Result<f32, MetricError> {
    let red_dc = mean(red).ok_or(MetricError::EmptySeries)?;
    let ir_dc = mean(ir).ok_or(MetricError::EmptySeries)?;
    if red_dc == 0.0 {
        return Err(MetricError::ZeroDc { channel: "red" });
    }
    if ir_dc == 0.0 {
        return Err(MetricError::ZeroDc { channel: "ir" });
    }

    let red_rms = rms(&detrend(red));
    let ir_rms = rms(&detrend(ir));
    if ir_rms == 0.0 {
        return Err(MetricError::ZeroAc { channel: "ir" });
    }

    let ratio = (red_rms / red_dc) / (ir_rms / ir_dc);
    if !ratio.is_finite() {
        return Err(MetricError::NonFinite("ratio"));
    }

    Ok((110.0 - 25.0 * ratio).clamp(0.0, 100.0) as f32)
}

/// Respiration rate (breaths/min) from the dominant frequency of the
/// heart-rate series inside `band_hz`, bounds excluded.
///
/// The detrended series is zero-padded to the next power of two before
/// the forward FFT. DC is never considered.
pub fn respiration_rate(
    heart_rate: &[f64],
    sample_rate_hz: f64,
    band_hz: [f64; 2],
) -> Result<f64, MetricError> {
    if heart_rate.is_empty() {
        return Err(MetricError::EmptySeries);
    }

    let detrended = detrend(heart_rate);
    let n = detrended.len().next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = detrended
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(n)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let [low, high] = band_hz;
    let mut max_magnitude = -1.0;
    let mut peak_freq = 0.0;
    for (i, bin) in buffer.iter().enumerate().take(n / 2).skip(1) {
        let freq = i as f64 * sample_rate_hz / n as f64;
        if freq > low && freq < high {
            let magnitude = bin.norm();
            if magnitude > max_magnitude {
                max_magnitude = magnitude;
                peak_freq = freq;
            }
        }
    }

    if max_magnitude < 0.0 {
        return Err(MetricError::NoSpectralPeak);
    }
    Ok(peak_freq * 60.0)
}
