//! # Pitch Detection Module
//!
//! This module implements the fundamental-frequency estimator used by the
//! detection loop. It provides robust monophonic detection using normalized
//! autocorrelation, tuned for live vocal and instrumental input.
//!
//! ## Features
//! - Normalized autocorrelation with a silence gate
//! - Edge trimming to keep silence padding out of the correlation window
//! - Confidence checking to reject aperiodic signals
//! - Parabolic interpolation for sub-sample accuracy

/// Minimum correlation peak accepted as a real periodicity.
/// A clean periodic tone correlates close to 1.0 at its true period.
const MIN_CONFIDENCE: f32 = 0.8;

/// How far below the global correlation maximum an earlier peak may sit and
/// still be preferred, to keep integer-multiple lags from winning.
const PEAK_TOLERANCE: f32 = 0.02;

/// Absolute sample level treated as silence when trimming the frame edges.
const TRIM_FLOOR: f32 = 0.01;

/// Smallest trimmed span worth correlating. Anything shorter cannot hold
/// two periods of a detectable pitch.
const MIN_SPAN: usize = 32;

/// Estimates the fundamental frequency of a single audio frame.
///
/// The estimator is deterministic and side-effect-free: the same frame and
/// sample rate always produce the same result.
///
/// 1. Gate on RMS amplitude to reject silence and low-SNR input.
/// 2. Trim the analysis span to the outermost samples above a small noise
///    floor, so silence padding does not dilute the correlation.
/// 3. Compute the normalized autocorrelation for every lag up to half the
///    span.
/// 4. Walk past the zero-lag peak until the curve stops falling, then take
///    the maximum beyond that point.
/// 5. Refine the peak lag with parabolic interpolation and convert to Hz.
///
/// # Arguments
/// * `signal` - Input audio frame, samples in roughly [-1, 1]
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude_threshold` - Minimum RMS amplitude for detection
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental frequency in Hz
/// * `None` - No pitch detected (silence, noise, or aperiodic signal)
pub fn estimate_pitch(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
) -> Option<f32> {
    if signal.is_empty() {
        return None;
    }

    // --- Noise Gate: Calculate RMS to filter out silence/noise ---
    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
    if rms < amplitude_threshold {
        return None;
    }

    // --- Trim: scan inward from both ends for the outermost loud samples ---
    let start = signal.iter().position(|s| s.abs() > TRIM_FLOOR)?;
    let end = signal.iter().rposition(|s| s.abs() > TRIM_FLOOR)?;
    let trimmed = &signal[start..=end];

    let size = trimmed.len();
    if size < MIN_SPAN {
        return None;
    }

    // --- Normalized autocorrelation over candidate lags ---
    // Running energy totals via a prefix sum of squares, so the two window
    // norms do not need re-summing for every lag.
    let mut energy = vec![0.0f32; size + 1];
    for (i, &s) in trimmed.iter().enumerate() {
        energy[i + 1] = energy[i] + s * s;
    }

    let half = size / 2;
    let mut corr = vec![0.0f32; half];
    for (lag, c) in corr.iter_mut().enumerate() {
        let mut sum = 0.0;
        for j in 0..(size - lag) {
            sum += trimmed[j] * trimmed[j + lag];
        }
        // Norms of the leading and lagged windows that overlap at this lag.
        let norm = (energy[size - lag] * (energy[size] - energy[lag])).sqrt();
        *c = if norm > 0.0 { sum / norm } else { 0.0 };
    }

    // --- Skip the trivial zero-lag peak: walk while the curve declines ---
    let mut d = 0;
    while d + 1 < half && corr[d] > corr[d + 1] {
        d += 1;
    }
    if d + 1 >= half {
        // The curve never turns back up: no periodicity inside the window.
        return None;
    }

    // --- Find the dominant peak past the first rising slope ---
    let mut peak_lag = 0;
    let mut peak_val = -1.0f32;
    for (lag, &c) in corr.iter().enumerate().skip(d) {
        if c > peak_val {
            peak_val = c;
            peak_lag = lag;
        }
    }
    if peak_lag == 0 || peak_val < MIN_CONFIDENCE {
        return None;
    }

    // --- Octave error prevention ---
    // Integer multiples of the true period correlate almost as well as the
    // period itself and can edge it out by a hair. Take the earliest peak
    // within tolerance of the global maximum instead of the maximum itself.
    let target = peak_val - PEAK_TOLERANCE;
    let mut lag = d;
    while lag < peak_lag && corr[lag] < target {
        lag += 1;
    }
    while lag + 1 < half && corr[lag + 1] > corr[lag] {
        lag += 1;
    }
    let peak_lag = lag;
    if peak_lag == 0 {
        return None;
    }

    // --- Parabolic interpolation for sub-sample precision ---
    let refined_lag = if peak_lag + 1 < half {
        let y1 = corr[peak_lag - 1];
        let y2 = corr[peak_lag];
        let y3 = corr[peak_lag + 1];
        let denom = y1 - 2.0 * y2 + y3;
        if denom.abs() > f32::EPSILON {
            let peak_shift = (y1 - y3) / (2.0 * denom);
            peak_lag as f32 + peak_shift
        } else {
            peak_lag as f32
        }
    } else {
        peak_lag as f32
    };

    let frequency = sample_rate as f32 / refined_lag;

    // Guard against degenerate lags producing nonsense frequencies.
    if frequency.is_finite() && frequency > 0.0 {
        Some(frequency)
    } else {
        None
    }
}
