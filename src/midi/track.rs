//! MIDI track representation.
//!
//! A track is built once from the decoded events of one track chunk. Note
//! events are paired into [`Note`]s; every other event is kept as a
//! [`MidiEvent`] with its global time. Notes are stored in end-time order,
//! which is what [`MidiTrack::notes_from`] searches on.

use super::event::{ChannelMessage, EventKind, MetaEvent, MidiEvent, RawEvent};
use super::note::{Note, NoteIds, PendingNote};
use super::programs::{ProgramChange, PERCUSSION_CHANNEL};
use crate::notify::{Listeners, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique track IDs.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(u64);

impl TrackId {
    /// Generates a new unique track ID.
    pub fn new() -> Self {
        Self(TRACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with note-ons still open when the track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnterminatedNotePolicy {
    /// Discard them, counting them in [`MidiTrack::dropped_notes`].
    #[default]
    Drop,
    /// Close them at the time of the track's last event.
    ClampToTrackEnd,
}

/// Change notifications published by a track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    ColorChanged { track: TrackId, color: String },
    VisibilityChanged { track: TrackId, visible: bool },
    ProgramChanged { track: TrackId, program: Option<ProgramChange> },
}

/// One track of a loaded MIDI file.
#[derive(Debug)]
pub struct MidiTrack {
    id: TrackId,
    name: String,
    /// Channel of the first channel event, if any.
    channel: Option<u8>,
    /// Non-note events in arrival order.
    events: Vec<MidiEvent>,
    /// Completed notes sorted by end tick.
    notes: Vec<Note>,
    program: Option<ProgramChange>,
    color: String,
    visible: bool,
    dropped_notes: usize,
    orphan_note_offs: usize,
    end_time: u64,
    listeners: Listeners<TrackEvent>,
}

impl MidiTrack {
    fn empty() -> Self {
        Self {
            id: TrackId::new(),
            name: String::new(),
            channel: None,
            events: Vec::new(),
            notes: Vec::new(),
            program: None,
            color: String::from("white"),
            visible: true,
            dropped_notes: 0,
            orphan_note_offs: 0,
            end_time: 0,
            listeners: Listeners::new(),
        }
    }

    /// Builds a track from the events of one track chunk.
    ///
    /// A note-on for a pitch that is already sounding is ignored, and a
    /// note-off with no open note is discarded. Notes still open at the end
    /// are handled according to `policy`.
    pub fn from_events(
        events: &[RawEvent],
        ids: &mut NoteIds,
        policy: UnterminatedNotePolicy,
    ) -> Self {
        let mut track = Self::empty();
        let mut pending: BTreeMap<u8, PendingNote> = BTreeMap::new();
        let mut name: Option<String> = None;
        let mut time: u64 = 0;

        for raw in events {
            time += raw.delta as u64;

            match &raw.kind {
                EventKind::Channel { channel, message } => {
                    track.channel.get_or_insert(*channel);

                    match *message {
                        ChannelMessage::NoteOn { key, velocity } => {
                            pending.entry(key).or_insert_with(|| {
                                PendingNote::open(ids.next_id(), key, velocity, *channel, time)
                            });
                            continue;
                        }
                        ChannelMessage::NoteOff { key, .. } => {
                            match pending.remove(&key) {
                                Some(note) => track.notes.push(note.close(time)),
                                None => track.orphan_note_offs += 1,
                            }
                            continue;
                        }
                        ChannelMessage::ProgramChange { program } => {
                            if track.program.is_none() {
                                track.set_program(ProgramChange::for_channel(*channel, program));
                            }
                        }
                        _ => {}
                    }
                }
                EventKind::Meta(MetaEvent::TrackName(text)) => {
                    name.get_or_insert_with(|| text.clone());
                }
                _ => {}
            }

            track.events.push(MidiEvent::new(raw.clone(), time));
        }

        match policy {
            UnterminatedNotePolicy::Drop => track.dropped_notes = pending.len(),
            UnterminatedNotePolicy::ClampToTrackEnd => {
                let mut open: Vec<PendingNote> = pending.into_values().collect();
                open.sort_by_key(|n| n.start_tick());
                track.notes.extend(open.into_iter().map(|n| n.close(time)));
            }
        }

        // GM drum parts often never send a program change.
        if track.program.is_none() && track.channel == Some(PERCUSSION_CHANNEL) {
            track.set_program(ProgramChange::for_channel(PERCUSSION_CHANNEL, 0));
        }

        if track.dropped_notes > 0 || track.orphan_note_offs > 0 {
            tracing::debug!(
                "Track {:?}: dropped {} unterminated notes, discarded {} unmatched note-offs",
                name,
                track.dropped_notes,
                track.orphan_note_offs
            );
        }

        track.name = name.unwrap_or_default();
        track.end_time = time;
        track
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Non-note events with their global times.
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Completed notes, sorted by end tick.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Note-ons discarded because no note-off closed them.
    pub fn dropped_notes(&self) -> usize {
        self.dropped_notes
    }

    /// Note-offs discarded because no note was open for their pitch.
    pub fn orphan_note_offs(&self) -> usize {
        self.orphan_note_offs
    }

    /// Global time of the last event in the track (usually end-of-track).
    pub fn end_time(&self) -> u64 {
        self.notes
            .last()
            .map_or(self.end_time, |n| n.end_tick.max(self.end_time))
    }

    pub fn program(&self) -> Option<ProgramChange> {
        self.program
    }

    /// Reclassifies the track's instrument. Notifies only on change.
    pub fn set_program(&mut self, program: Option<ProgramChange>) {
        if self.program != program {
            self.program = program;
            self.listeners.emit(&TrackEvent::ProgramChanged {
                track: self.id,
                program,
            });
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Assigns the display colour. Notifies only on change.
    pub fn set_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        if self.color != color {
            self.color = color;
            self.listeners.emit(&TrackEvent::ColorChanged {
                track: self.id,
                color: self.color.clone(),
            });
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the track. Notifies only on change.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.listeners.emit(&TrackEvent::VisibilityChanged {
                track: self.id,
                visible,
            });
        }
    }

    /// Registers a callback for colour, visibility and program changes.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&TrackEvent) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Notes ending at or after `global_time`, in end-time order, through to
    /// the end of the track.
    ///
    /// Each call starts a fresh iterator; the starting point is found by
    /// binary search on the end-time order.
    pub fn notes_from(&self, global_time: u64) -> impl Iterator<Item = &Note> + '_ {
        let first = self.notes.partition_point(|n| n.end_tick < global_time);
        self.notes[first..].iter()
    }

    /// Combines this track with `other` into a new track.
    ///
    /// Name, colour, program and visibility come from `self`. Events are
    /// merged by global time with `self` first on ties, dropping `other`'s
    /// meta events, and their deltas are recomputed. Notes are merged and kept
    /// in end-time order. Neither input is modified.
    pub fn merge(&self, other: &MidiTrack) -> MidiTrack {
        let mut events = Vec::with_capacity(self.events.len() + other.events.len());
        let mut last_time = 0u64;
        let (mut i, mut j) = (0, 0);

        loop {
            let source = match (self.events.get(i), other.events.get(j)) {
                (Some(a), Some(b)) if a.global_time <= b.global_time => {
                    i += 1;
                    a
                }
                (Some(a), None) => {
                    i += 1;
                    a
                }
                (_, Some(b)) => {
                    j += 1;
                    if b.kind().is_meta() {
                        continue;
                    }
                    b
                }
                (None, None) => break,
            };

            let mut event = source.clone();
            event.event.delta = u32::try_from(source.global_time - last_time).unwrap_or(u32::MAX);
            last_time = source.global_time;
            events.push(event);
        }

        let mut notes = Vec::with_capacity(self.notes.len() + other.notes.len());
        notes.extend_from_slice(&self.notes);
        notes.extend_from_slice(&other.notes);
        notes.sort_by_key(|n| n.end_tick);

        MidiTrack {
            id: TrackId::new(),
            name: self.name.clone(),
            channel: self.channel.or(other.channel),
            events,
            notes,
            program: self.program,
            color: self.color.clone(),
            visible: self.visible,
            dropped_notes: self.dropped_notes + other.dropped_notes,
            orphan_note_offs: self.orphan_note_offs + other.orphan_note_offs,
            end_time: self.end_time.max(other.end_time),
            listeners: Listeners::new(),
        }
    }
}
