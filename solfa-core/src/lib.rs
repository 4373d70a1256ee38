// solfa-core/src/lib.rs

//! The core logic for the Solfa ear-training tuner.
//! This crate is responsible for audio capture, pitch detection,
//! note naming and movable-doh solfège mapping, and the single-flight
//! detection loop. It is completely headless and contains no GUI code.

pub mod audio;
pub mod fft;
pub mod pitch;
pub mod scheduler;
pub mod solfege;
pub mod tuning;

/// One confident pitch reading, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The detected frequency formatted to two decimal places.
    pub pitch_display: String,
    /// The nearest equal-tempered note name (e.g. "Eb4").
    pub note: String,
    /// The movable-doh syllable for the note under the current root.
    pub syllable: &'static str,
}

/// The payload pushed to the presentation layer after each completed tick.
// The spectrum refreshes on every analyzed frame; `detection` is only
// `Some` when a confident, in-range pitch was found on this tick.
#[derive(Debug, Clone)]
pub struct DetectionUpdate {
    /// The new reading, if this tick produced one.
    pub detection: Option<Detection>,
    /// Magnitude spectrum of the analyzed frame, for visualization.
    pub spectrum: Vec<f32>,
}

/// The externally published detection state, owned by the detection loop.
///
/// Overwritten at most once per tick while the loop is running. Stopping
/// the loop clears `active` but keeps the last reading visible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionState {
    /// Last confident frequency, formatted to two decimal places.
    pub pitch_display: String,
    /// Last confident note name.
    pub note: String,
    /// Last confident solfège syllable.
    pub syllable: String,
    /// Whether the detection loop is currently running.
    pub active: bool,
}
