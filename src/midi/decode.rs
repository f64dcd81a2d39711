//! Standard MIDI File (SMF) decoding.
//!
//! Decodes .mid bytes into a header and one [`RawEvent`] list per track chunk.
//! Byte-level parsing is delegated to `midly`; this module only maps its
//! borrowed event model onto the owned one in [`super::event`].
//!
//! # Limitations
//!
//! - Format 2 (sequential) files are rejected
//! - SMPTE timecode timing is rejected, only metrical (ticks-per-beat) files load
//! - Note-on with velocity 0 is reported as note-off

use super::event::{ChannelMessage, EventKind, MetaEvent, RawEvent};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Errors that can occur while loading a MIDI file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("MIDI parse error: {0}")]
    Parse(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// SMF layout of the decoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmfFormat {
    /// Format 0: one track carrying every channel.
    SingleTrack,
    /// Format 1: simultaneous tracks, track 0 conventionally holds tempo/meta.
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub format: SmfFormat,
    pub track_count: usize,
    pub ticks_per_beat: u16,
}

/// A decoded file: header plus per-track event lists in chunk order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    pub header: Header,
    pub tracks: Vec<Vec<RawEvent>>,
}

/// Decodes SMF bytes.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] for malformed data and
/// [`LoadError::UnsupportedFormat`] for format 2 or timecode-timed files.
pub fn decode(bytes: &[u8]) -> Result<DecodedFile, LoadError> {
    let smf = Smf::parse(bytes).map_err(|e| LoadError::Parse(e.to_string()))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(_, _) => {
            return Err(LoadError::UnsupportedFormat(
                "SMPTE timecode timing not supported".to_string(),
            ))
        }
    };
    if ticks_per_beat == 0 {
        return Err(LoadError::Parse("ticks per beat is zero".to_string()));
    }

    let format = match smf.header.format {
        Format::SingleTrack => SmfFormat::SingleTrack,
        Format::Parallel => SmfFormat::Parallel,
        Format::Sequential => {
            return Err(LoadError::UnsupportedFormat(
                "Format 2 (sequential) MIDI files not supported".to_string(),
            ))
        }
    };

    let tracks: Vec<Vec<RawEvent>> = smf
        .tracks
        .iter()
        .map(|track| {
            track
                .iter()
                .map(|event| RawEvent::new(event.delta.as_int(), convert_kind(&event.kind)))
                .collect()
        })
        .collect();

    Ok(DecodedFile {
        header: Header {
            format,
            track_count: tracks.len(),
            ticks_per_beat,
        },
        tracks,
    })
}

fn convert_kind(kind: &TrackEventKind<'_>) -> EventKind {
    match *kind {
        TrackEventKind::Midi { channel, message } => EventKind::Channel {
            channel: channel.as_int(),
            message: convert_message(message),
        },
        TrackEventKind::Meta(meta) => EventKind::Meta(convert_meta(meta)),
        TrackEventKind::SysEx(data) | TrackEventKind::Escape(data) => {
            EventKind::SysEx(data.to_vec())
        }
    }
}

fn convert_message(message: MidiMessage) -> ChannelMessage {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => ChannelMessage::NoteOff {
            key: key.as_int(),
            velocity: 0,
        },
        MidiMessage::NoteOn { key, vel } => ChannelMessage::NoteOn {
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOff { key, vel } => ChannelMessage::NoteOff {
            key: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::Aftertouch { key, vel } => ChannelMessage::Aftertouch {
            key: key.as_int(),
            pressure: vel.as_int(),
        },
        MidiMessage::Controller { controller, value } => ChannelMessage::Controller {
            controller: controller.as_int(),
            value: value.as_int(),
        },
        MidiMessage::ProgramChange { program } => ChannelMessage::ProgramChange {
            program: program.as_int(),
        },
        MidiMessage::ChannelAftertouch { vel } => ChannelMessage::ChannelPressure {
            pressure: vel.as_int(),
        },
        MidiMessage::PitchBend { bend } => ChannelMessage::PitchBend {
            value: bend.0.as_int(),
        },
    }
}

fn convert_meta(meta: MetaMessage<'_>) -> MetaEvent {
    match meta {
        MetaMessage::TrackName(bytes) => {
            MetaEvent::TrackName(String::from_utf8_lossy(bytes).into_owned())
        }
        MetaMessage::Text(bytes) => MetaEvent::Text(String::from_utf8_lossy(bytes).into_owned()),
        MetaMessage::Tempo(tempo) => MetaEvent::SetTempo(tempo.as_int()),
        MetaMessage::TimeSignature(numerator, denominator_power, _, _) => {
            MetaEvent::TimeSignature {
                numerator,
                denominator_power,
            }
        }
        MetaMessage::KeySignature(sharps, minor) => MetaEvent::KeySignature { sharps, minor },
        MetaMessage::EndOfTrack => MetaEvent::EndOfTrack,
        _ => MetaEvent::Other,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal SMF writer for tests. Each track is a list of
    /// (delta, event bytes without delta); end-of-track is appended.
    pub(crate) fn smf_bytes(format: u16, ticks_per_beat: u16, tracks: &[Vec<(u32, Vec<u8>)>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&format.to_be_bytes());
        out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        out.extend_from_slice(&ticks_per_beat.to_be_bytes());

        for track in tracks {
            let mut data = Vec::new();
            for (delta, bytes) in track {
                write_vlq(*delta, &mut data);
                data.extend_from_slice(bytes);
            }
            data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

            out.extend_from_slice(b"MTrk");
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(&data);
        }
        out
    }

    fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
        let mut bytes = vec![(value & 0x7F) as u8];
        let mut rest = value >> 7;
        while rest > 0 {
            bytes.push(((rest & 0x7F) as u8) | 0x80);
            rest >>= 7;
        }
        buffer.extend(bytes.iter().rev());
    }

    pub(crate) fn track_name(name: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0x03, name.len() as u8];
        bytes.extend_from_slice(name.as_bytes());
        bytes
    }

    pub(crate) fn tempo(micros: u32) -> Vec<u8> {
        vec![0xFF, 0x51, 0x03, (micros >> 16) as u8, (micros >> 8) as u8, micros as u8]
    }

    pub(crate) fn time_signature(numerator: u8, denominator_power: u8) -> Vec<u8> {
        vec![0xFF, 0x58, 0x04, numerator, denominator_power, 24, 8]
    }

    pub(crate) fn note_on(key: u8, velocity: u8) -> Vec<u8> {
        vec![0x90, key, velocity]
    }

    pub(crate) fn note_off(key: u8) -> Vec<u8> {
        vec![0x80, key, 0]
    }

    #[test]
    fn test_vlq() {
        let mut buffer = Vec::new();
        write_vlq(0, &mut buffer);
        write_vlq(128, &mut buffer);
        write_vlq(0x3FFF, &mut buffer);
        assert_eq!(buffer, vec![0x00, 0x81, 0x00, 0xFF, 0x7F]);
    }

    #[test]
    fn test_decode_events() {
        let bytes = smf_bytes(
            1,
            96,
            &[
                vec![(0, track_name("Song")), (0, tempo(400_000)), (0, time_signature(3, 2))],
                vec![
                    (0, vec![0xC0, 40]),
                    (0, note_on(60, 90)),
                    (96, note_on(60, 0)),
                    (0, vec![0xB0, 7, 100]),
                ],
            ],
        );

        let file = decode(&bytes).unwrap();
        assert_eq!(file.header.format, SmfFormat::Parallel);
        assert_eq!(file.header.track_count, 2);
        assert_eq!(file.header.ticks_per_beat, 96);

        assert_eq!(
            file.tracks[0],
            vec![
                RawEvent::meta(0, MetaEvent::TrackName("Song".to_string())),
                RawEvent::meta(0, MetaEvent::SetTempo(400_000)),
                RawEvent::meta(0, MetaEvent::TimeSignature { numerator: 3, denominator_power: 2 }),
                RawEvent::meta(0, MetaEvent::EndOfTrack),
            ]
        );

        let music = &file.tracks[1];
        assert_eq!(
            music[0].kind,
            EventKind::Channel { channel: 0, message: ChannelMessage::ProgramChange { program: 40 } }
        );
        assert_eq!(music[1], RawEvent::note_on(0, 60, 90));
        // Velocity-zero note-on reads as note-off.
        assert_eq!(music[2], RawEvent::note_off(96, 60));
    }

    #[test]
    fn test_malformed_bytes() {
        assert!(matches!(decode(b"not a midi file"), Err(LoadError::Parse(_))));
        assert!(matches!(decode(&[]), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_sequential_format_rejected() {
        let bytes = smf_bytes(2, 96, &[vec![]]);
        assert!(matches!(decode(&bytes), Err(LoadError::UnsupportedFormat(_))));
    }
}
