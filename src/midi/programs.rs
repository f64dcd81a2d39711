//! General MIDI program table.
//!
//! Maps a program-change value (0-127) to an instrument name and its GM
//! family. Channel 10 (index 9) is the GM percussion channel and always
//! resolves to the drum kit, whatever program it selects.

use serde::Serialize;
use std::fmt;

/// MIDI channel index reserved for percussion in General MIDI.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// General MIDI instrument family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum InstrumentType {
    Piano,
    ChromaticPercussion,
    Organ,
    Guitar,
    Bass,
    Strings,
    Ensemble,
    Brass,
    Reed,
    Pipe,
    SynthLead,
    SynthPad,
    SynthEffects,
    Ethnic,
    Percussive,
    SoundEffects,
    /// Channel 10 drum kits.
    Drums,
}

impl InstrumentType {
    const FAMILIES: [InstrumentType; 16] = [
        InstrumentType::Piano,
        InstrumentType::ChromaticPercussion,
        InstrumentType::Organ,
        InstrumentType::Guitar,
        InstrumentType::Bass,
        InstrumentType::Strings,
        InstrumentType::Ensemble,
        InstrumentType::Brass,
        InstrumentType::Reed,
        InstrumentType::Pipe,
        InstrumentType::SynthLead,
        InstrumentType::SynthPad,
        InstrumentType::SynthEffects,
        InstrumentType::Ethnic,
        InstrumentType::Percussive,
        InstrumentType::SoundEffects,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstrumentType::Piano => "Piano",
            InstrumentType::ChromaticPercussion => "Chromatic Percussion",
            InstrumentType::Organ => "Organ",
            InstrumentType::Guitar => "Guitar",
            InstrumentType::Bass => "Bass",
            InstrumentType::Strings => "Strings",
            InstrumentType::Ensemble => "Ensemble",
            InstrumentType::Brass => "Brass",
            InstrumentType::Reed => "Reed",
            InstrumentType::Pipe => "Pipe",
            InstrumentType::SynthLead => "Synth Lead",
            InstrumentType::SynthPad => "Synth Pad",
            InstrumentType::SynthEffects => "Synth Effects",
            InstrumentType::Ethnic => "Ethnic",
            InstrumentType::Percussive => "Percussive",
            InstrumentType::SoundEffects => "Sound Effects",
            InstrumentType::Drums => "Drums",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved program change: the instrument a track plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProgramChange {
    pub program: u8,
    pub instrument: &'static str,
    pub kind: InstrumentType,
}

impl ProgramChange {
    /// Looks up a GM program number. Returns `None` above 127.
    pub fn get(program: u8) -> Option<Self> {
        let instrument = *GM_PROGRAMS.get(program as usize)?;
        Some(Self {
            program,
            instrument,
            kind: InstrumentType::FAMILIES[program as usize / 8],
        })
    }

    /// Resolves a program change seen on `channel`, honouring the GM drum channel.
    pub fn for_channel(channel: u8, program: u8) -> Option<Self> {
        if channel == PERCUSSION_CHANNEL {
            return Some(Self {
                program: program.min(127),
                instrument: "Drum Kit",
                kind: InstrumentType::Drums,
            });
        }
        Self::get(program)
    }
}

impl fmt::Display for ProgramChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.instrument, self.kind)
    }
}

const GM_PROGRAMS: [&str; 128] = [
    // Piano
    "Acoustic Grand Piano",
    "Bright Acoustic Piano",
    "Electric Grand Piano",
    "Honky-tonk Piano",
    "Electric Piano 1",
    "Electric Piano 2",
    "Harpsichord",
    "Clavinet",
    // Chromatic percussion
    "Celesta",
    "Glockenspiel",
    "Music Box",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "Tubular Bells",
    "Dulcimer",
    // Organ
    "Drawbar Organ",
    "Percussive Organ",
    "Rock Organ",
    "Church Organ",
    "Reed Organ",
    "Accordion",
    "Harmonica",
    "Tango Accordion",
    // Guitar
    "Acoustic Guitar (nylon)",
    "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)",
    "Electric Guitar (clean)",
    "Electric Guitar (muted)",
    "Overdriven Guitar",
    "Distortion Guitar",
    "Guitar Harmonics",
    // Bass
    "Acoustic Bass",
    "Electric Bass (finger)",
    "Electric Bass (pick)",
    "Fretless Bass",
    "Slap Bass 1",
    "Slap Bass 2",
    "Synth Bass 1",
    "Synth Bass 2",
    // Strings
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "Tremolo Strings",
    "Pizzicato Strings",
    "Orchestral Harp",
    "Timpani",
    // Ensemble
    "String Ensemble 1",
    "String Ensemble 2",
    "Synth Strings 1",
    "Synth Strings 2",
    "Choir Aahs",
    "Voice Oohs",
    "Synth Voice",
    "Orchestra Hit",
    // Brass
    "Trumpet",
    "Trombone",
    "Tuba",
    "Muted Trumpet",
    "French Horn",
    "Brass Section",
    "Synth Brass 1",
    "Synth Brass 2",
    // Reed
    "Soprano Sax",
    "Alto Sax",
    "Tenor Sax",
    "Baritone Sax",
    "Oboe",
    "English Horn",
    "Bassoon",
    "Clarinet",
    // Pipe
    "Piccolo",
    "Flute",
    "Recorder",
    "Pan Flute",
    "Blown Bottle",
    "Shakuhachi",
    "Whistle",
    "Ocarina",
    // Synth lead
    "Lead 1 (square)",
    "Lead 2 (sawtooth)",
    "Lead 3 (calliope)",
    "Lead 4 (chiff)",
    "Lead 5 (charang)",
    "Lead 6 (voice)",
    "Lead 7 (fifths)",
    "Lead 8 (bass + lead)",
    // Synth pad
    "Pad 1 (new age)",
    "Pad 2 (warm)",
    "Pad 3 (polysynth)",
    "Pad 4 (choir)",
    "Pad 5 (bowed)",
    "Pad 6 (metallic)",
    "Pad 7 (halo)",
    "Pad 8 (sweep)",
    // Synth effects
    "FX 1 (rain)",
    "FX 2 (soundtrack)",
    "FX 3 (crystal)",
    "FX 4 (atmosphere)",
    "FX 5 (brightness)",
    "FX 6 (goblins)",
    "FX 7 (echoes)",
    "FX 8 (sci-fi)",
    // Ethnic
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bagpipe",
    "Fiddle",
    "Shanai",
    // Percussive
    "Tinkle Bell",
    "Agogo",
    "Steel Drums",
    "Woodblock",
    "Taiko Drum",
    "Melodic Tom",
    "Synth Drum",
    "Reverse Cymbal",
    // Sound effects
    "Guitar Fret Noise",
    "Breath Noise",
    "Seashore",
    "Bird Tweet",
    "Telephone Ring",
    "Helicopter",
    "Applause",
    "Gunshot",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let piano = ProgramChange::get(0).unwrap();
        assert_eq!(piano.instrument, "Acoustic Grand Piano");
        assert_eq!(piano.kind, InstrumentType::Piano);

        let violin = ProgramChange::get(40).unwrap();
        assert_eq!(violin.instrument, "Violin");
        assert_eq!(violin.kind, InstrumentType::Strings);

        let gunshot = ProgramChange::get(127).unwrap();
        assert_eq!(gunshot.kind, InstrumentType::SoundEffects);

        assert!(ProgramChange::get(128).is_none());
    }

    #[test]
    fn test_drum_channel() {
        let drums = ProgramChange::for_channel(PERCUSSION_CHANNEL, 0).unwrap();
        assert_eq!(drums.kind, InstrumentType::Drums);
        assert_eq!(drums.instrument, "Drum Kit");

        let bass = ProgramChange::for_channel(1, 33).unwrap();
        assert_eq!(bass.instrument, "Electric Bass (finger)");
        assert_eq!(bass.kind, InstrumentType::Bass);
    }
}
