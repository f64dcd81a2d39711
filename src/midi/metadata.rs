//! Bar-indexed tempo, time-signature and key-signature timeline.
//!
//! Built in one pass over the meta track: deltas are accumulated against the
//! current bar length, one snapshot is emitted per bar boundary crossed, and
//! each meta event then applies to the bar it falls in. A time signature
//! arriving mid-bar takes effect at the next bar line instead. The timeline
//! is extended afterwards so it covers the musical content of every track.

use super::event::{EventKind, MetaEvent, RawEvent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo assumed until the first set-tempo event: 500000 µs/quarter (120 bpm).
pub const DEFAULT_TEMPO_MICROS: u32 = 500_000;

/// Key signature as sharps (negative for flats) and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeySignature {
    pub sharps: i8,
    pub minor: bool,
}

impl KeySignature {
    const MAJOR: [&'static str; 15] = [
        "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
    ];
    const MINOR: [&'static str; 15] = [
        "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
    ];

    /// Tonic name, e.g. `Eb`. `None` for sharp counts outside -7..=7.
    pub fn tonic(&self) -> Option<&'static str> {
        let index = usize::try_from(self.sharps as i16 + 7).ok()?;
        if self.minor {
            Self::MINOR.get(index).copied()
        } else {
            Self::MAJOR.get(index).copied()
        }
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.minor { "minor" } else { "major" };
        match self.tonic() {
            Some(tonic) => write!(f, "{} {}", tonic, mode),
            None => write!(f, "{} sharps {}", self.sharps, mode),
        }
    }
}

/// Effective metadata at the start of one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSnapshot {
    /// 1-based bar number.
    pub bar: u32,
    /// Tick at which the bar starts.
    pub global_time: u64,
    /// 1-based beat at which the bar starts, counted in the time signature's beat unit.
    pub global_beat: u32,
    pub time_sig_numerator: u8,
    pub time_sig_denominator: u8,
    /// Microseconds per quarter note.
    pub tempo: u32,
    pub bpm: u32,
    pub key_signature: KeySignature,
    /// Bar length in ticks.
    pub ticks: u64,
}

impl BarSnapshot {
    fn first(ticks_per_beat: u64) -> Self {
        let mut snapshot = Self {
            bar: 1,
            global_time: 0,
            global_beat: 1,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            tempo: DEFAULT_TEMPO_MICROS,
            bpm: 120,
            key_signature: KeySignature::default(),
            ticks: 0,
        };
        snapshot.ticks = snapshot.bar_ticks(ticks_per_beat);
        snapshot
    }

    /// The following bar, carrying every signature forward.
    fn next(&self) -> Self {
        Self {
            bar: self.bar + 1,
            global_time: self.global_time + self.ticks,
            global_beat: self.global_beat + self.time_sig_numerator as u32,
            ..self.clone()
        }
    }

    fn bar_ticks(&self, ticks_per_beat: u64) -> u64 {
        let quarter_ticks = self.time_sig_numerator as u64 * ticks_per_beat * 4;
        (quarter_ticks / self.time_sig_denominator as u64).max(1)
    }

    fn apply(&mut self, meta: &MetaEvent, ticks_per_beat: u64) {
        match *meta {
            MetaEvent::SetTempo(micros) if micros > 0 => {
                self.tempo = micros;
                self.bpm = (60_000_000.0 / micros as f64).round() as u32;
            }
            MetaEvent::TimeSignature {
                numerator,
                denominator_power,
            } if numerator > 0 => {
                self.time_sig_numerator = numerator;
                self.time_sig_denominator = 1u8 << denominator_power.min(7);
                self.ticks = self.bar_ticks(ticks_per_beat);
            }
            MetaEvent::KeySignature { sharps, minor } => {
                self.key_signature = KeySignature { sharps, minor };
            }
            _ => {}
        }
    }

    /// Tick at which the next bar starts.
    pub fn end_time(&self) -> u64 {
        self.global_time + self.ticks
    }

    /// Number of beats in this bar.
    pub fn beats(&self) -> u32 {
        self.time_sig_numerator as u32
    }
}

/// Dense, bar-indexed metadata for a loaded file. Bar `n` lives at index `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidiMetadataTimeline {
    bars: Vec<BarSnapshot>,
    title: Option<String>,
}

impl MidiMetadataTimeline {
    /// Derives the timeline from the meta track's events.
    ///
    /// `content_end` is the last tick holding musical content across all
    /// tracks; trailing bars are synthesised until the timeline reaches it.
    pub fn build(meta_track: &[RawEvent], ticks_per_beat: u16, content_end: u64) -> Self {
        let tpb = ticks_per_beat.max(1) as u64;
        let mut bars = Vec::new();
        let mut title = None;
        let mut current = BarSnapshot::first(tpb);
        let mut elapsed: u64 = 0;
        // Signature changes arriving mid-bar wait for the next bar line.
        let mut deferred: Option<MetaEvent> = None;

        for event in meta_track {
            elapsed += event.delta as u64;

            while elapsed >= current.ticks {
                elapsed -= current.ticks;
                close_bar(&mut bars, &mut current, &mut deferred, tpb);
            }

            if let EventKind::Meta(meta) = &event.kind {
                match meta {
                    MetaEvent::TrackName(text) => title = Some(text.clone()),
                    MetaEvent::TimeSignature { .. } if elapsed > 0 => {
                        deferred = Some(meta.clone());
                    }
                    other => current.apply(other, tpb),
                }
            }
        }

        // A bar opening exactly where the meta track ends is only kept if
        // content reaches into it.
        if bars.is_empty() || elapsed > 0 {
            close_bar(&mut bars, &mut current, &mut deferred, tpb);
        }

        while bars.last().is_some_and(|b: &BarSnapshot| b.end_time() < content_end) {
            close_bar(&mut bars, &mut current, &mut deferred, tpb);
        }

        Self { bars, title }
    }

    /// Snapshot for a 1-based bar number.
    pub fn get(&self, bar: u32) -> Option<&BarSnapshot> {
        let index = bar.checked_sub(1)? as usize;
        self.bars.get(index)
    }

    /// Bar containing the 1-based `beat`, or `None` outside the timeline.
    pub fn bar_from_beat(&self, beat: f64) -> Option<u32> {
        if !(beat >= 1.0) {
            return None;
        }
        let index = self
            .bars
            .partition_point(|b| ((b.global_beat + b.beats()) as f64) <= beat);
        self.bars.get(index).map(|b| b.bar)
    }

    /// Bar containing `tick`, or `None` past the end of the timeline.
    pub fn bar_at_tick(&self, tick: u64) -> Option<u32> {
        let index = self.bars.partition_point(|b| b.end_time() <= tick);
        self.bars.get(index).map(|b| b.bar)
    }

    /// Beats from the first beat of bar 1 through the last beat of the final bar.
    pub fn total_beats(&self) -> u32 {
        self.bars
            .last()
            .map_or(0, |b| b.global_beat + b.beats() - 1)
    }

    /// Tick at which the final bar ends.
    pub fn end_time(&self) -> u64 {
        self.bars.last().map_or(0, BarSnapshot::end_time)
    }

    /// Last track name seen on the meta track.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn bars(&self) -> &[BarSnapshot] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Pushes the open bar and opens the next one, applying any deferred
/// signature change to it.
fn close_bar(
    bars: &mut Vec<BarSnapshot>,
    current: &mut BarSnapshot,
    deferred: &mut Option<MetaEvent>,
    ticks_per_beat: u64,
) {
    let mut next = current.next();
    if let Some(signature) = deferred.take() {
        next.apply(&signature, ticks_per_beat);
    }
    bars.push(std::mem::replace(current, next));
}
