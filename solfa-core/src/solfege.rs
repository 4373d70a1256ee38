//! # Solfège Mapping Module
//!
//! Movable-doh solfège over the chromatic scale: "do" always lands on the
//! user-selected root, and every chromatic step gets its own syllable. The
//! rotator and mapper are pure functions; the root itself lives in the
//! detection loop.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::tuning::NOTE_NAMES;

/// Chromatic movable-doh syllables, aligned index-for-index with a rotated
/// chromatic sequence: index 0 is always "do" on the root.
pub const SYLLABLES: [&str; 12] = [
    "do", "ra", "re", "me", "mi", "fa", "se", "sol", "le", "la", "te", "ti",
];

/// Sharp spellings accepted as input, paired with their flat equivalents.
const SHARP_SPELLINGS: [(&str, &str); 5] = [
    ("C#", "Db"),
    ("D#", "Eb"),
    ("F#", "Gb"),
    ("G#", "Ab"),
    ("A#", "Bb"),
];

/// Static map from pitch-class spelling to chromatic index, covering both
/// flat and sharp spellings.
static PITCH_CLASS_INDEX: Lazy<BTreeMap<&'static str, usize>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, usize> = NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i))
        .collect();
    for (sharp, flat) in SHARP_SPELLINGS {
        // This is safe as every sharp spelling has a flat twin in NOTE_NAMES.
        let index = NOTE_NAMES.iter().position(|&name| name == flat).unwrap();
        map.insert(sharp, index);
    }
    map
});

/// Looks up the chromatic index of a pitch-class spelling.
///
/// Accepts flat or sharp spellings ("Eb" and "D#" both resolve to index 3).
///
/// # Returns
/// * `Some(index)` - Position in the canonical flat chromatic list (0-11)
/// * `None` - Not one of the 12 pitch classes
pub fn pitch_class_index(name: &str) -> Option<usize> {
    PITCH_CLASS_INDEX.get(name).copied()
}

/// Builds the 12-tone chromatic sequence starting at `root`.
///
/// The output is always flat-spelled, a pure rotation of the canonical
/// list; sharp-spelled roots are normalized before rotating.
///
/// # Arguments
/// * `root` - Root pitch class, flat or sharp spelling
///
/// # Returns
/// * `Some(sequence)` - 12 pitch-class names with the root at index 0
/// * `None` - `root` is not one of the 12 pitch classes
pub fn rotate(root: &str) -> Option<[&'static str; 12]> {
    let root_index = pitch_class_index(root)?;
    let mut sequence = [""; 12];
    for (i, slot) in sequence.iter_mut().enumerate() {
        *slot = NOTE_NAMES[(root_index + i) % 12];
    }
    Some(sequence)
}

/// Strips the octave suffix from a note name ("Eb4" -> "Eb").
pub fn strip_octave(note: &str) -> &str {
    note.trim_end_matches(|c: char| c.is_ascii_digit() || c == '-')
}

/// Maps a note into its movable-doh syllable under the given root.
///
/// Strips the octave, rotates the chromatic sequence onto the root, and
/// returns the syllable aligned with the note's position in that sequence.
///
/// # Returns
/// * `Some(syllable)` - The aligned syllable, e.g. "me" for Eb over C
/// * `None` - Unknown spelling, or the pitch class is missing from the
///   rotated sequence. The latter cannot happen for well-formed input and
///   means the chromatic and syllable tables are out of sync; callers
///   treat it as a defect, not as a valid "no syllable" result.
pub fn syllable_for(note: &str, root: &str) -> Option<&'static str> {
    let class_index = pitch_class_index(strip_octave(note))?;
    let class = NOTE_NAMES[class_index];
    let sequence = rotate(root)?;
    let position = sequence.iter().position(|&name| name == class)?;
    Some(SYLLABLES[position])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_onto_c() {
        assert_eq!(
            rotate("C").unwrap(),
            ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"]
        );
    }

    #[test]
    fn rotates_onto_d() {
        assert_eq!(
            rotate("D").unwrap(),
            ["D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B", "C", "Db"]
        );
    }

    #[test]
    fn sharp_roots_normalize_to_flat_rotations() {
        assert_eq!(rotate("F#"), rotate("Gb"));
        assert_eq!(rotate("C#"), rotate("Db"));
    }

    #[test]
    fn rotation_is_pure() {
        assert_eq!(rotate("Ab"), rotate("Ab"));
    }

    #[test]
    fn unknown_root_is_rejected() {
        assert_eq!(rotate("H"), None);
        assert_eq!(rotate(""), None);
    }

    #[test]
    fn maps_notes_to_syllables() {
        let cases = [
            ("C4", "C", "do"),
            ("Eb4", "C", "me"),
            ("D4", "D", "do"),
            ("A3", "C", "la"),
            ("Bb5", "D", "le"),
            ("C#4", "C", "ra"),
        ];
        for (note, root, expected) in cases {
            assert_eq!(syllable_for(note, root), Some(expected), "{} over {}", note, root);
        }
    }

    #[test]
    fn every_pitch_class_has_a_syllable() {
        for (i, &class) in NOTE_NAMES.iter().enumerate() {
            assert_eq!(syllable_for(class, "C"), Some(SYLLABLES[i]));
        }
    }

    #[test]
    fn strips_octave_digits() {
        assert_eq!(strip_octave("Eb4"), "Eb");
        assert_eq!(strip_octave("A10"), "A");
        assert_eq!(strip_octave("C-1"), "C");
        assert_eq!(strip_octave("Bb"), "Bb");
    }
}
