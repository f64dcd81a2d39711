//! MIDI note representation.
//!
//! A note is a note-on/note-off pair. While the note-off has not arrived it is
//! a [`PendingNote`]; closing it is the only way to obtain a [`Note`], so every
//! note stored in a track has a defined end.

use serde::{Deserialize, Serialize};

/// Unique identifier for a note within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(u64);

impl NoteId {
    /// Returns the raw ID value (for serialization/debugging).
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Monotonic note ID source.
///
/// Owned by a document rather than global, so separate documents (and
/// separate tests) never share a counter.
#[derive(Debug, Clone)]
pub struct NoteIds {
    next: u64,
}

impl NoteIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> NoteId {
        let id = NoteId(self.next);
        self.next += 1;
        id
    }
}

impl Default for NoteIds {
    fn default() -> Self {
        Self::new()
    }
}

/// A note whose note-on has been seen but whose note-off has not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNote {
    id: NoteId,
    pitch: u8,
    velocity: u8,
    channel: u8,
    start_tick: u64,
}

impl PendingNote {
    pub fn open(id: NoteId, pitch: u8, velocity: u8, channel: u8, start_tick: u64) -> Self {
        Self {
            id,
            pitch: pitch.min(127),
            velocity: velocity.min(127),
            channel,
            start_tick,
        }
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn start_tick(&self) -> u64 {
        self.start_tick
    }

    /// Sets the end tick, turning this into a completed [`Note`].
    ///
    /// An end before the start is clamped to the start.
    pub fn close(self, end_tick: u64) -> Note {
        Note {
            id: self.id,
            pitch: self.pitch,
            velocity: self.velocity,
            channel: self.channel,
            start_tick: self.start_tick,
            end_tick: end_tick.max(self.start_tick),
        }
    }
}

/// A completed note interval in global ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for this note instance.
    pub id: NoteId,

    /// MIDI note number (0-127). 60 = Middle C (C4).
    pub pitch: u8,

    /// Note-on velocity (0-127).
    pub velocity: u8,

    /// Channel the note-on arrived on.
    pub channel: u8,

    pub start_tick: u64,

    pub end_tick: u64,
}

impl Note {
    /// Duration in ticks (`end - start`).
    pub fn width(&self) -> u64 {
        self.end_tick - self.start_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_counter() {
        let mut a = NoteIds::new();
        let mut b = NoteIds::new();
        let first = a.next_id();
        let second = a.next_id();
        assert!(second > first);
        assert_eq!(b.next_id(), first);
    }

    #[test]
    fn test_close_sets_end_and_width() {
        let mut ids = NoteIds::new();
        let pending = PendingNote::open(ids.next_id(), 60, 100, 0, 480);
        let note = pending.close(960);
        assert_eq!(note.start_tick, 480);
        assert_eq!(note.end_tick, 960);
        assert_eq!(note.width(), 480);
    }

    #[test]
    fn test_close_before_start_is_clamped() {
        let mut ids = NoteIds::new();
        let note = PendingNote::open(ids.next_id(), 60, 100, 0, 480).close(100);
        assert_eq!(note.end_tick, 480);
        assert_eq!(note.width(), 0);
    }
}
