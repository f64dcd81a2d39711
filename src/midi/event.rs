//! Decoded MIDI events.
//!
//! The decoder turns the borrowed `midly` representation into these owned
//! types so tracks can outlive the byte buffer they were read from.

use serde::{Deserialize, Serialize};

/// Meta events the document cares about. Anything else is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaEvent {
    TrackName(String),
    Text(String),
    /// Microseconds per quarter note.
    SetTempo(u32),
    /// Numerator and denominator as a power of two (2 means quarter note).
    TimeSignature { numerator: u8, denominator_power: u8 },
    /// Number of sharps (negative for flats) and minor flag.
    KeySignature { sharps: i8, minor: bool },
    EndOfTrack,
    Other,
}

/// Channel voice messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMessage {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8, velocity: u8 },
    ProgramChange { program: u8 },
    Controller { controller: u8, value: u8 },
    /// Raw 14-bit value, 0x2000 is centred.
    PitchBend { value: u16 },
    Aftertouch { key: u8, pressure: u8 },
    ChannelPressure { pressure: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Meta(MetaEvent),
    Channel { channel: u8, message: ChannelMessage },
    SysEx(Vec<u8>),
}

impl EventKind {
    pub fn is_meta(&self) -> bool {
        matches!(self, EventKind::Meta(_))
    }
}

/// One event as it appears in a track chunk, timed relative to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Ticks since the previous event in the same track.
    pub delta: u32,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(delta: u32, kind: EventKind) -> Self {
        Self { delta, kind }
    }

    pub fn meta(delta: u32, meta: MetaEvent) -> Self {
        Self::new(delta, EventKind::Meta(meta))
    }

    pub fn channel(delta: u32, channel: u8, message: ChannelMessage) -> Self {
        Self::new(
            delta,
            EventKind::Channel {
                channel: channel & 0x0F,
                message,
            },
        )
    }

    pub fn note_on(delta: u32, key: u8, velocity: u8) -> Self {
        Self::channel(delta, 0, ChannelMessage::NoteOn { key, velocity })
    }

    pub fn note_off(delta: u32, key: u8) -> Self {
        Self::channel(delta, 0, ChannelMessage::NoteOff { key, velocity: 0 })
    }
}

/// A raw event paired with its absolute tick position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub event: RawEvent,
    /// Ticks since the start of the track.
    pub global_time: u64,
}

impl MidiEvent {
    pub fn new(event: RawEvent, global_time: u64) -> Self {
        Self { event, global_time }
    }

    pub fn kind(&self) -> &EventKind {
        &self.event.kind
    }
}
