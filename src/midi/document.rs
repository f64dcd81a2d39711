//! A loaded MIDI file: its tracks and bar metadata.
//!
//! The document is the single owner of everything derived from a file.
//! Loading replaces all state; merges and removals edit the track list in
//! place. Observers are notified synchronously once each operation completes.

use super::decode::{decode, DecodedFile, Header, LoadError};
use super::metadata::{BarSnapshot, MidiMetadataTimeline};
use super::note::NoteIds;
use super::track::{MidiTrack, TrackId, UnterminatedNotePolicy};
use crate::notify::{Listeners, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors reading a [`DocumentConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings applied when loading files into a [`MidiDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Colours handed out round-robin by file track index.
    pub palette: Vec<String>,

    /// Index of the track chunk holding tempo, time and key signatures.
    pub meta_track: usize,

    pub unterminated_notes: UnterminatedNotePolicy,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            palette: ["green", "blue", "yellow", "orange", "red"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            meta_track: 0,
            unterminated_notes: UnterminatedNotePolicy::Drop,
        }
    }
}

impl DocumentConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a config from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// How [`MidiDocument::merge_by`] groups tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackGrouping {
    /// Same General MIDI instrument.
    Instrument,
    /// Same General MIDI family (piano, strings, ...).
    InstrumentType,
    /// Every track into one.
    All,
}

impl TrackGrouping {
    fn key(self, track: &MidiTrack) -> String {
        match self {
            TrackGrouping::Instrument => track
                .program()
                .map_or("Unknown", |p| p.instrument)
                .to_string(),
            TrackGrouping::InstrumentType => track
                .program()
                .map_or("Unknown", |p| p.kind.name())
                .to_string(),
            TrackGrouping::All => "All".to_string(),
        }
    }
}

/// Figures reported once a load completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub title: String,
    pub track_count: usize,
    pub bar_count: usize,
    pub total_beats: u32,
    pub ticks_per_beat: u16,
}

/// Change notifications published by a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A load finished. `None` means it failed or was aborted.
    Loaded(Option<LoadSummary>),
    /// Tracks were merged or removed.
    TracksChanged { track_count: usize },
}

/// The in-memory state of one loaded MIDI file.
#[derive(Debug)]
pub struct MidiDocument {
    config: DocumentConfig,
    header: Option<Header>,
    title: String,
    tracks: Vec<MidiTrack>,
    timeline: MidiMetadataTimeline,
    total_beats: u32,
    content_end: u64,
    note_ids: NoteIds,
    listeners: Listeners<DocumentEvent>,
}

impl MidiDocument {
    pub fn new(config: DocumentConfig) -> Self {
        Self {
            config,
            header: None,
            title: String::new(),
            tracks: Vec::new(),
            timeline: MidiMetadataTimeline::default(),
            total_beats: 0,
            content_end: 0,
            note_ids: NoteIds::new(),
            listeners: Listeners::new(),
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Registers a callback for load and track-list notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn reset(&mut self) {
        self.header = None;
        self.title.clear();
        self.tracks.clear();
        self.timeline = MidiMetadataTimeline::default();
        self.total_beats = 0;
        self.content_end = 0;
    }

    /// Replaces the document contents with the decoded `bytes`.
    ///
    /// # Errors
    ///
    /// On failure the document is left empty, observers receive
    /// `Loaded(None)` and the decode error is returned.
    pub fn load(&mut self, bytes: &[u8]) -> Result<LoadSummary, LoadError> {
        self.reset();

        let decoded = match decode(bytes) {
            Ok(decoded) => decoded,
            Err(e) => return self.fail(e),
        };
        self.populate(decoded);

        let summary = LoadSummary {
            title: self.title.clone(),
            track_count: self.tracks.len(),
            bar_count: self.timeline.len(),
            total_beats: self.total_beats,
            ticks_per_beat: self.ticks_per_beat().unwrap_or_default(),
        };
        tracing::info!(
            "Loaded MIDI file {:?}: {} tracks, {} bars, {} beats",
            summary.title,
            summary.track_count,
            summary.bar_count,
            summary.total_beats
        );

        self.listeners
            .emit(&DocumentEvent::Loaded(Some(summary.clone())));
        Ok(summary)
    }

    /// Reads and loads a .mid file.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadSummary, LoadError> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => self.load(&bytes),
            Err(source) => self.fail(LoadError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Abandons the current document, notifying observers with `Loaded(None)`.
    pub fn abort(&mut self) {
        self.reset();
        self.listeners.emit(&DocumentEvent::Loaded(None));
    }

    fn fail(&mut self, error: LoadError) -> Result<LoadSummary, LoadError> {
        tracing::warn!("Failed to load MIDI file: {}", error);
        self.abort();
        Err(error)
    }

    fn populate(&mut self, decoded: DecodedFile) {
        let DecodedFile { header, tracks } = decoded;
        if tracks.is_empty() {
            self.header = Some(header);
            return;
        }

        let meta_index = self.config.meta_track;
        let policy = self.config.unterminated_notes;

        let palette = &self.config.palette;
        for (index, events) in tracks.iter().enumerate() {
            let mut track = MidiTrack::from_events(events, &mut self.note_ids, policy);
            // The meta track only shows up as a track if it carries notes (format 0).
            if index == meta_index && track.note_count() == 0 {
                continue;
            }
            // Colours follow the file's track index, so the first track of a
            // format 1 file takes the second palette entry.
            if !palette.is_empty() {
                track.set_color(palette[index % palette.len()].clone());
            }
            self.tracks.push(track);
        }

        self.content_end = self.tracks.iter().map(MidiTrack::end_time).max().unwrap_or(0);
        let meta_events = tracks.get(meta_index).map_or(&[][..], Vec::as_slice);
        self.timeline =
            MidiMetadataTimeline::build(meta_events, header.ticks_per_beat, self.content_end);
        self.title = self.timeline.title().unwrap_or_default().to_string();
        self.total_beats = self.timeline.total_beats();
        self.header = Some(header);
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn ticks_per_beat(&self) -> Option<u16> {
        self.header.map(|h| h.ticks_per_beat)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn timeline(&self) -> &MidiMetadataTimeline {
        &self.timeline
    }

    /// Metadata for a 1-based bar number.
    pub fn metadata_item(&self, bar: u32) -> Option<&BarSnapshot> {
        self.timeline.get(bar)
    }

    /// Tempo of `bar` in beats per minute.
    pub fn tempo(&self, bar: u32) -> Option<u32> {
        self.metadata_item(bar).map(|m| m.bpm)
    }

    /// Tempo of `bar` in microseconds per quarter note.
    pub fn tempo_micros(&self, bar: u32) -> Option<u32> {
        self.metadata_item(bar).map(|m| m.tempo)
    }

    pub fn time_signature_numerator(&self, bar: u32) -> Option<u8> {
        self.metadata_item(bar).map(|m| m.time_sig_numerator)
    }

    pub fn time_signature_denominator(&self, bar: u32) -> Option<u8> {
        self.metadata_item(bar).map(|m| m.time_sig_denominator)
    }

    /// Bar containing the 1-based `beat`.
    pub fn bar_from_beat(&self, beat: f64) -> Option<u32> {
        self.timeline.bar_from_beat(beat)
    }

    pub fn total_beats(&self) -> u32 {
        self.total_beats
    }

    /// Last tick holding a note end or end-of-track across the loaded tracks.
    pub fn content_end(&self) -> u64 {
        self.content_end
    }

    pub fn tracks(&self) -> &[MidiTrack] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&MidiTrack> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// Mutable access for colour, visibility and program edits.
    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut MidiTrack> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    fn index_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id() == id)
    }

    fn emit_tracks_changed(&mut self) {
        let event = DocumentEvent::TracksChanged {
            track_count: self.tracks.len(),
        };
        self.listeners.emit(&event);
    }

    /// Merges `b` into `a`: `a`'s slot receives the merged track and `b`'s
    /// slot is removed. Returns the merged track's ID.
    pub fn merge_tracks(&mut self, a: TrackId, b: TrackId) -> Option<TrackId> {
        if a == b {
            return None;
        }
        let ai = self.index_of(a)?;
        let bi = self.index_of(b)?;

        let merged = self.tracks[ai].merge(&self.tracks[bi]);
        let id = merged.id();
        self.tracks[ai] = merged;
        self.tracks.remove(bi);

        self.emit_tracks_changed();
        Some(id)
    }

    /// Left-folds [`MidiTrack::merge`] over `ids`, naming the result `name`.
    ///
    /// The merged track takes the slot of the first ID; the others are
    /// removed. Needs at least two distinct, known tracks.
    pub fn merge_track_group(&mut self, ids: &[TrackId], name: &str) -> Option<TrackId> {
        let id = self.merge_group(ids, name)?;
        self.emit_tracks_changed();
        Some(id)
    }

    fn merge_group(&mut self, ids: &[TrackId], name: &str) -> Option<TrackId> {
        let indices: Vec<usize> = ids
            .iter()
            .map(|id| self.index_of(*id))
            .collect::<Option<_>>()?;
        let (&first, rest) = indices.split_first()?;
        if rest.is_empty() {
            return None;
        }

        // Duplicate IDs would merge a track with itself.
        let mut removed = rest.to_vec();
        removed.sort_unstable();
        removed.dedup();
        if removed.len() != rest.len() || removed.contains(&first) {
            return None;
        }

        let mut merged: Option<MidiTrack> = None;
        for &i in rest {
            let left = merged.as_ref().unwrap_or(&self.tracks[first]);
            let next = left.merge(&self.tracks[i]);
            merged = Some(next);
        }
        let mut merged = merged?;
        merged.set_name(name);
        let id = merged.id();

        self.tracks[first] = merged;
        for i in removed.into_iter().rev() {
            self.tracks.remove(i);
        }
        Some(id)
    }

    /// Merges every group of tracks sharing a grouping key. Each merged
    /// track is named after its key. Returns the number of groups merged.
    pub fn merge_by(&mut self, grouping: TrackGrouping) -> usize {
        let mut groups: BTreeMap<String, Vec<TrackId>> = BTreeMap::new();
        for track in &self.tracks {
            groups
                .entry(grouping.key(track))
                .or_default()
                .push(track.id());
        }

        let mut merged = 0;
        for (key, ids) in groups.into_iter().filter(|(_, ids)| ids.len() > 1) {
            if self.merge_group(&ids, &key).is_some() {
                merged += 1;
            }
        }

        if merged > 0 {
            self.emit_tracks_changed();
        }
        merged
    }

    /// Removes a track from the document.
    pub fn remove_track(&mut self, id: TrackId) -> Option<MidiTrack> {
        let index = self.index_of(id)?;
        let track = self.tracks.remove(index);
        self.emit_tracks_changed();
        Some(track)
    }
}

impl Default for MidiDocument {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}
