//! Equal-tempered pitch: scientific name, MIDI number and frequency.

use crate::midi::NOTE_NAMES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frequency of C0 in Hz, the base of every pitch and overtone computation.
pub const C0_FREQUENCY: f64 = 16.3516;

/// Lowest MIDI number representable as a [`Pitch`] (C0).
const MIN_MIDI: i32 = 12;

/// Highest MIDI number representable as a [`Pitch`] (G9).
const MAX_MIDI: i32 = 127;

/// Errors raised when constructing pitches or overtones from bad input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PitchError {
    #[error("invalid note name: {0:?}")]
    InvalidName(String),
    #[error("MIDI value {0} out of range for a pitch (12-127)")]
    MidiOutOfRange(i32),
    #[error("frequency must be finite and positive, got {0}")]
    InvalidFrequency(f64),
}

/// An immutable equal-tempered pitch between C0 (MIDI 12) and G9 (MIDI 127).
///
/// Flat spellings are accepted when parsing, but the pitch always renders
/// with sharps: `"Db4".parse::<Pitch>()` displays as `C#4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pitch {
    midi: u8,
}

impl Pitch {
    /// Creates a pitch from a MIDI note number.
    ///
    /// # Errors
    ///
    /// Returns [`PitchError::MidiOutOfRange`] below C0 (12) or above 127.
    ///
    /// # Examples
    ///
    /// ```
    /// use overtone_roll::overtone::Pitch;
    ///
    /// let a4 = Pitch::from_midi(69).unwrap();
    /// assert_eq!(a4.scientific(), "A4");
    /// assert!((a4.frequency() - 440.0).abs() < 0.01);
    /// ```
    pub fn from_midi(midi: u8) -> Result<Self, PitchError> {
        Self::from_midi_number(midi as i32)
    }

    pub(crate) fn from_midi_number(midi: i32) -> Result<Self, PitchError> {
        if !(MIN_MIDI..=MAX_MIDI).contains(&midi) {
            return Err(PitchError::MidiOutOfRange(midi));
        }
        Ok(Self { midi: midi as u8 })
    }

    /// Parses scientific pitch notation such as `C4`, `f#3` or `Bb2`.
    pub fn from_scientific(name: &str) -> Result<Self, PitchError> {
        name.parse()
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// Frequency in Hz: `16.3516 * 2^((midi - 12) / 12)`.
    pub fn frequency(&self) -> f64 {
        C0_FREQUENCY * 2f64.powf((self.midi as i32 - MIN_MIDI) as f64 / 12.0)
    }

    /// Letter plus accidental, always spelled with sharps.
    pub fn letter(&self) -> &'static str {
        NOTE_NAMES[(self.midi % 12) as usize]
    }

    pub fn octave(&self) -> u8 {
        self.midi / 12 - 1
    }

    /// Canonical scientific name, e.g. `C#4`.
    pub fn scientific(&self) -> String {
        format!("{}{}", self.letter(), self.octave())
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PitchError::InvalidName(s.to_string());
        let mut chars = s.trim().chars();

        let mut step: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let octave_text = if let Some(r) = rest.strip_prefix('#') {
            step += 1;
            r
        } else if let Some(r) = rest.strip_prefix('b') {
            step -= 1;
            r
        } else {
            rest
        };

        if octave_text.is_empty() || !octave_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let octave: i32 = octave_text.parse().map_err(|_| invalid())?;

        Self::from_midi_number(octave.saturating_mul(12).saturating_add(MIN_MIDI + step))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.octave())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_round_trip() {
        for m in 12u8..=127 {
            let pitch = Pitch::from_midi(m).unwrap();
            assert_eq!(pitch.midi(), m);

            let expected = C0_FREQUENCY * 2f64.powf((m as f64 - 12.0) / 12.0);
            assert!(((pitch.frequency() - expected) / expected).abs() < 1e-9);

            let reparsed: Pitch = pitch.scientific().parse().unwrap();
            assert_eq!(reparsed, pitch);
        }
    }

    #[test]
    fn test_reference_pitches() {
        let a4: Pitch = "A4".parse().unwrap();
        assert_eq!(a4.midi(), 69);
        assert!((a4.frequency() - 440.0).abs() < 0.01);

        let c0 = Pitch::from_midi(12).unwrap();
        assert_eq!(c0.scientific(), "C0");
        assert!((c0.frequency() - C0_FREQUENCY).abs() < 1e-12);
    }

    #[test]
    fn test_flat_spelling_normalised_to_sharp() {
        let db4: Pitch = "Db4".parse().unwrap();
        assert_eq!(db4.midi(), 61);
        assert_eq!(db4.scientific(), "C#4");
        assert_eq!(db4.letter(), "C#");
        assert_eq!(db4.octave(), 4);

        let lower: Pitch = "bb2".parse().unwrap();
        assert_eq!(lower.scientific(), "A#2");
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(matches!("H4".parse::<Pitch>(), Err(PitchError::InvalidName(_))));
        assert!(matches!("C".parse::<Pitch>(), Err(PitchError::InvalidName(_))));
        assert!(matches!("C-1".parse::<Pitch>(), Err(PitchError::InvalidName(_))));
        assert!(matches!("C#x".parse::<Pitch>(), Err(PitchError::InvalidName(_))));
        assert!(matches!("".parse::<Pitch>(), Err(PitchError::InvalidName(_))));
        assert_eq!("Cb0".parse::<Pitch>(), Err(PitchError::MidiOutOfRange(11)));
        assert_eq!("G#9".parse::<Pitch>(), Err(PitchError::MidiOutOfRange(128)));
        assert_eq!(Pitch::from_midi(11), Err(PitchError::MidiOutOfRange(11)));
    }
}
