//! Standard MIDI File loading and the data structures built from it.
//!
//! [`decode`] turns raw bytes into per-track event lists. [`MidiTrack`]
//! pairs note events into [`Note`]s, [`MidiMetadataTimeline`] derives a
//! bar-by-bar view of tempo and signatures, and [`MidiDocument`] owns the
//! result of a load.

mod decode;
mod document;
mod event;
mod metadata;
mod note;
mod programs;
mod track;

pub use decode::{decode, DecodedFile, Header, LoadError, SmfFormat};
pub use document::{
    ConfigError, DocumentConfig, DocumentEvent, LoadSummary, MidiDocument, TrackGrouping,
};
pub use event::{ChannelMessage, EventKind, MetaEvent, MidiEvent, RawEvent};
pub use metadata::{BarSnapshot, KeySignature, MidiMetadataTimeline, DEFAULT_TEMPO_MICROS};
pub use note::{Note, NoteId, NoteIds, PendingNote};
pub use programs::{InstrumentType, ProgramChange, PERCUSSION_CHANNEL};
pub use track::{MidiTrack, TrackEvent, TrackId, UnterminatedNotePolicy};

/// Note names within an octave, indexed by MIDI note number modulo 12.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Converts a MIDI note number to a name with octave, e.g. 60 -> "C4".
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Converts a tick span to seconds at a tempo given in microseconds per
/// quarter note.
pub fn ticks_to_seconds(ticks: u64, ticks_per_beat: u16, tempo_micros: u32) -> f64 {
    if ticks_per_beat == 0 {
        return 0.0;
    }
    let beats = ticks as f64 / ticks_per_beat as f64;
    beats * tempo_micros as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_name() {
        assert_eq!(note_to_name(60), "C4");
        assert_eq!(note_to_name(69), "A4");
        assert_eq!(note_to_name(0), "C-1");
        assert_eq!(note_to_name(127), "G9");
    }

    #[test]
    fn test_ticks_to_seconds() {
        // 120 bpm: one beat is half a second.
        assert!((ticks_to_seconds(480, 480, 500_000) - 0.5).abs() < 1e-9);
        assert!((ticks_to_seconds(1920, 480, 1_000_000) - 4.0).abs() < 1e-9);
        assert_eq!(ticks_to_seconds(480, 0, 500_000), 0.0);
    }
}
