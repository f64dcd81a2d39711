//! A single harmonic and its deviation from equal temperament.

use super::pitch::{Pitch, PitchError, C0_FREQUENCY};
use serde::{Deserialize, Serialize};

/// One harmonic frequency together with its nearest equal-tempered pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overtone {
    frequency: f64,
    /// Nearest semitone above C0.
    semitone: i32,
    /// Signed deviation from the nearest semitone, in [-50, 50].
    cents: i32,
}

impl Overtone {
    /// Analyses `frequency` against the equal-tempered grid.
    ///
    /// # Errors
    ///
    /// Returns [`PitchError::InvalidFrequency`] for zero, negative or
    /// non-finite input.
    pub fn new(frequency: f64) -> Result<Self, PitchError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(PitchError::InvalidFrequency(frequency));
        }

        let r = 12.0 * (frequency / C0_FREQUENCY).log2();
        let h = r.round();

        Ok(Self {
            frequency,
            semitone: h as i32,
            cents: (100.0 * (r - h)).round() as i32,
        })
    }

    /// Overtone analysis of a pitch given in scientific notation.
    pub fn from_scientific(scientific: &str) -> Result<Self, PitchError> {
        Self::new(Pitch::from_scientific(scientific)?.frequency())
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn cents(&self) -> i32 {
        self.cents
    }

    /// MIDI number of the nearest equal-tempered semitone. May fall outside
    /// 0-127 for very low or very high harmonics.
    pub fn nearest_midi(&self) -> i32 {
        self.semitone + 12
    }

    /// Nearest pitch, or `None` when it lies outside the C0..=G9 range.
    pub fn closest_pitch(&self) -> Option<Pitch> {
        Pitch::from_midi_number(self.nearest_midi()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pitch_has_no_deviation() {
        let a4 = Overtone::from_scientific("A4").unwrap();
        assert_eq!(a4.cents(), 0);
        assert_eq!(a4.closest_pitch().unwrap().scientific(), "A4");
    }

    #[test]
    fn test_seventh_harmonic_is_flat() {
        // The 7th harmonic of C2 lands about 31 cents flat of A#4.
        let c2 = Pitch::from_scientific("C2").unwrap().frequency();
        let seventh = Overtone::new(c2 * 7.0).unwrap();
        assert_eq!(seventh.closest_pitch().unwrap().scientific(), "A#4");
        assert_eq!(seventh.cents(), -31);
    }

    #[test]
    fn test_fifth_harmonic_is_flat_major_third() {
        let c2 = Pitch::from_scientific("C2").unwrap().frequency();
        let fifth = Overtone::new(c2 * 5.0).unwrap();
        assert_eq!(fifth.closest_pitch().unwrap().scientific(), "E4");
        assert_eq!(fifth.cents(), -14);
    }

    #[test]
    fn test_cents_bounded() {
        for fundamental in [16.3516, 27.5, 41.2, 97.999, 130.81, 311.13, 1000.0] {
            for k in 1..=64 {
                let overtone = Overtone::new(fundamental * k as f64).unwrap();
                assert!((-50..=50).contains(&overtone.cents()));
                assert_eq!(overtone.frequency(), fundamental * k as f64);
            }
        }
    }

    #[test]
    fn test_out_of_range_pitch_is_none() {
        let high = Overtone::new(20_000.0).unwrap();
        assert!(high.nearest_midi() > 127);
        assert!(high.closest_pitch().is_none());
    }

    #[test]
    fn test_invalid_frequency() {
        assert!(Overtone::new(0.0).is_err());
        assert!(Overtone::new(-1.0).is_err());
        assert!(Overtone::new(f64::NAN).is_err());
    }
}
