//! Harmonic series of a fundamental up to a frequency ceiling.

use super::overtone::Overtone;
use super::pitch::{Pitch, PitchError};
use std::ops::Deref;

/// The harmonics `f, 2f, 3f, ...` of a fundamental `f`, stopping at the last
/// multiple that does not exceed the limit frequency.
///
/// Index 0 is the fundamental itself. The series is materialised on
/// construction; dereference to a slice to iterate it.
#[derive(Debug, Clone, PartialEq)]
pub struct OvertoneSequence {
    fundamental: f64,
    limit: f64,
    overtones: Vec<Overtone>,
}

impl OvertoneSequence {
    /// Builds the series of `fundamental` up to and including `limit` Hz.
    ///
    /// # Errors
    ///
    /// Returns [`PitchError::InvalidFrequency`] if the fundamental is not a
    /// finite positive number or the limit is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use overtone_roll::overtone::OvertoneSequence;
    ///
    /// let series = OvertoneSequence::new(110.0, 440.0).unwrap();
    /// assert_eq!(series.len(), 4);
    /// assert_eq!(series[3].frequency(), 440.0);
    /// ```
    pub fn new(fundamental: f64, limit: f64) -> Result<Self, PitchError> {
        if !fundamental.is_finite() || fundamental <= 0.0 {
            return Err(PitchError::InvalidFrequency(fundamental));
        }
        if !limit.is_finite() {
            return Err(PitchError::InvalidFrequency(limit));
        }

        let mut overtones = Vec::new();
        let mut multiplier = 1u32;
        while fundamental * multiplier as f64 <= limit {
            overtones.push(Overtone::new(fundamental * multiplier as f64)?);
            multiplier += 1;
        }

        Ok(Self {
            fundamental,
            limit,
            overtones,
        })
    }

    /// Series of a pitch given in scientific notation.
    pub fn from_scientific(scientific: &str, limit: f64) -> Result<Self, PitchError> {
        Self::new(Pitch::from_scientific(scientific)?.frequency(), limit)
    }

    pub fn fundamental(&self) -> f64 {
        self.fundamental
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// The series without the fundamental, i.e. harmonics 2, 3, ...
    pub fn harmonics(&self) -> impl Iterator<Item = &Overtone> {
        self.overtones.iter().skip(1)
    }
}

impl Deref for OvertoneSequence {
    type Target = [Overtone];

    fn deref(&self) -> &[Overtone] {
        &self.overtones
    }
}

impl<'a> IntoIterator for &'a OvertoneSequence {
    type Item = &'a Overtone;
    type IntoIter = std::slice::Iter<'a, Overtone>;

    fn into_iter(self) -> Self::IntoIter {
        self.overtones.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_matches_floor_of_ratio() {
        for (fundamental, limit) in [
            (55.0, 1000.0),
            (110.0, 440.0),
            (65.41, 20_000.0),
            (261.63, 5000.0),
            (16.3516, 16_000.0),
        ] {
            let series = OvertoneSequence::new(fundamental, limit).unwrap();
            assert_eq!(series.len(), (limit / fundamental).floor() as usize);
            assert!(series.iter().all(|o| o.frequency() <= limit));
        }
    }

    #[test]
    fn test_limit_below_fundamental_is_empty() {
        let series = OvertoneSequence::new(440.0, 100.0).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.harmonics().count(), 0);
    }

    #[test]
    fn test_harmonics_skip_fundamental() {
        let series = OvertoneSequence::from_scientific("C2", 500.0).unwrap();
        assert_eq!(series[0].closest_pitch().unwrap().scientific(), "C2");

        let names: Vec<String> = series
            .harmonics()
            .take(4)
            .map(|o| o.closest_pitch().unwrap().scientific())
            .collect();
        assert_eq!(names, vec!["C3", "G3", "C4", "E4"]);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(OvertoneSequence::new(0.0, 1000.0).is_err());
        assert!(OvertoneSequence::new(100.0, f64::INFINITY).is_err());
        assert!(OvertoneSequence::from_scientific("X2", 1000.0).is_err());
    }
}
