//! # Spectrum Module
//!
//! Computes the magnitude spectrum of an analysis frame for the live
//! spectrum display. Pitch detection itself is time-domain; this module
//! only feeds the visualization.

use rustfft::{num_complex::Complex, FftPlanner};

/// Removes the DC offset from a signal by making its average value zero.
///
/// A DC component shows up as a large 0 Hz bin and dwarfs the rest of the
/// display.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a Hann window to the buffer to reduce spectral leakage.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Computes the magnitude spectrum of a frame for visualization.
///
/// The signal is DC-corrected and Hann-windowed, transformed, and reduced
/// to the magnitudes of the first half of the spectrum (up to Nyquist).
///
/// # Arguments
/// * `signal` - Input audio frame of any length
///
/// # Returns
/// * `Vec<f32>` - Magnitudes for bins 0 to len/2
pub fn magnitude_spectrum(signal: &[f32]) -> Vec<f32> {
    if signal.is_empty() {
        return Vec::new();
    }

    let mut processed = signal.to_vec();
    remove_dc_offset(&mut processed);
    apply_hann_window(&mut processed);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(processed.len());

    let mut buffer: Vec<Complex<f32>> = processed
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();
    fft.process(&mut buffer);

    buffer
        .iter()
        .take(signal.len() / 2)
        .map(|c| c.norm())
        .collect()
}
