//! # Musical Tuning Module
//!
//! This module converts detected frequencies into equal-tempered note names.
//! All naming is referenced to A4 = 440 Hz with the octave divided into 12
//! logarithmically equal semitones; no alternate tuning systems are
//! supported.
//!
//! ## Features
//! - Closed-form frequency to note-name conversion for any audible pitch
//! - Flat spellings, matching the chromatic sequence used for solfège
//! - Nearest-semitone rounding with ties rounding to the higher pitch

/// Reference pitch for equal-tempered naming, in Hz.
pub const A4_FREQ: f32 = 440.0;

/// Flat-spelled pitch-class names, starting at C.
///
/// This is the canonical chromatic list: the solfège rotator builds every
/// rotated sequence from it, so note naming and syllable lookup can never
/// disagree on spelling.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Rounds a frequency to its distance from A4 in whole semitones.
///
/// An exact half-semitone distance rounds toward the higher pitch.
fn semitones_from_a4(frequency: f32) -> i32 {
    (12.0 * (frequency / A4_FREQ).log2() + 0.5).floor() as i32
}

/// Names the equal-tempered note nearest to a frequency.
///
/// The frequency must be positive and finite; the detection loop only
/// passes confident estimates through, which are both.
///
/// # Arguments
/// * `frequency` - Input frequency in Hz
///
/// # Returns
/// * Note name with flat spelling and octave, e.g. "A4", "Eb3"
pub fn note_name(frequency: f32) -> String {
    debug_assert!(frequency.is_finite() && frequency > 0.0);

    // A4 sits nine semitones above C4, and the octave number changes at C.
    let from_c4 = semitones_from_a4(frequency) + 9;
    let class = from_c4.rem_euclid(12) as usize;
    let octave = 4 + from_c4.div_euclid(12);
    format!("{}{}", NOTE_NAMES[class], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reference_pitches() {
        let cases = [
            (440.0, "A4"),
            (261.63, "C4"),
            (220.0, "A3"),
            (466.16, "Bb4"),
            (92.5, "Gb2"),
            (1479.98, "Gb6"),
            (27.5, "A0"),
        ];
        for (freq, expected) in cases {
            assert_eq!(note_name(freq), expected, "for {} Hz", freq);
        }
    }

    #[test]
    fn slightly_detuned_pitches_snap_to_nearest() {
        assert_eq!(note_name(445.0), "A4");
        assert_eq!(note_name(430.0), "A4");
        assert_eq!(note_name(455.0), "Bb4");
    }

    #[test]
    fn half_semitone_boundary_rounds_to_higher_pitch() {
        // Frequencies a hair either side of 50 cents above A4. The boundary
        // itself belongs to the higher pitch.
        let tie = A4_FREQ * 2.0f32.powf(0.5 / 12.0);
        assert_eq!(note_name(tie * 1.0001), "Bb4");
        assert_eq!(note_name(tie * 0.9999), "A4");
    }
}
