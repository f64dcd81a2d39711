//! Pitch and harmonic-series arithmetic for the overtone overlay.
//!
//! All frequencies are equal-tempered relative to C0 = 16.3516 Hz, which
//! places A4 at 440 Hz.

mod overtone;
mod pitch;
mod sequence;

pub use overtone::Overtone;
pub use pitch::{Pitch, PitchError, C0_FREQUENCY};
pub use sequence::OvertoneSequence;
