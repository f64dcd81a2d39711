//! overtone-roll - MIDI file analysis for piano-roll displays.
//!
//! This library loads Standard MIDI Files into per-track note lists with
//! time-ranged lookup, derives a bar-by-bar tempo and signature timeline, and
//! computes harmonic overtone series for pitch overlays.

pub mod midi;
pub mod notify;
pub mod overtone;

// Re-export commonly used types
pub use midi::{
    DocumentConfig, DocumentEvent, LoadError, MidiDocument, MidiMetadataTimeline, MidiTrack, Note,
    NoteId, TrackGrouping, TrackId,
};
pub use overtone::{Overtone, OvertoneSequence, Pitch, PitchError};
