//! overtone-roll - prints what a piano-roll display would draw for a MIDI file.
//!
//! Loads a Standard MIDI File and reports its bar timeline (tempo, time and
//! key signatures), its tracks, and optionally the harmonic series of a pitch.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- song.mid
//! cargo run -- song.mid --merge type --json
//! cargo run -- --overtones C2 --limit 2000
//! ```
//!
//! Set `RUST_LOG=debug` to see per-track parsing diagnostics.

use anyhow::{bail, Context, Result};
use overtone_roll::midi::{note_to_name, ticks_to_seconds};
use overtone_roll::{DocumentConfig, MidiDocument, OvertoneSequence, TrackGrouping};
use std::path::PathBuf;

/// Default ceiling for printed overtone series, roughly the top of a piano.
const DEFAULT_OVERTONE_LIMIT: f64 = 4200.0;

/// Command-line options for the application.
struct CliOptions {
    /// MIDI file to load.
    file: Option<PathBuf>,
    /// JSON document config.
    config: Option<PathBuf>,
    merge: Option<TrackGrouping>,
    /// Pitch whose harmonic series is printed.
    overtones: Option<String>,
    limit: f64,
    /// Dump the bar timeline as JSON instead of a table.
    json: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `<file.mid>`: MIDI file to analyse
    /// - `--config <path>` or `-c <path>`: JSON document config
    /// - `--merge <all|instrument|type>` or `-m`: merge tracks before printing
    /// - `--overtones <pitch>` or `-o`: print the harmonic series of a pitch
    /// - `--limit <hz>`: overtone ceiling
    /// - `--json`: print the bar timeline as JSON
    /// - `--help` or `-h`: print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            file: None,
            config: None,
            merge: None,
            overtones: None,
            limit: DEFAULT_OVERTONE_LIMIT,
            json: false,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    options.config = Some(PathBuf::from(value(&args, &mut i, "--config")?));
                }
                "--merge" | "-m" => {
                    options.merge = Some(match value(&args, &mut i, "--merge")? {
                        "all" => TrackGrouping::All,
                        "instrument" => TrackGrouping::Instrument,
                        "type" => TrackGrouping::InstrumentType,
                        other => bail!("Unknown merge grouping: {} (expected all, instrument or type)", other),
                    });
                }
                "--overtones" | "-o" => {
                    options.overtones = Some(value(&args, &mut i, "--overtones")?.to_string());
                }
                "--limit" => {
                    let text = value(&args, &mut i, "--limit")?;
                    options.limit = text
                        .parse()
                        .with_context(|| format!("Invalid overtone limit: {}", text))?;
                }
                "--json" => options.json = true,
                "--help" | "-h" => {
                    print_help(args.first().map_or("overtone-roll", String::as_str));
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    bail!("Unknown option: {}\nUse --help for usage information", other);
                }
                other => options.file = Some(PathBuf::from(other)),
            }
            i += 1;
        }

        if options.file.is_none() && options.overtones.is_none() {
            bail!("Nothing to do: give a MIDI file or --overtones <pitch>\nUse --help for usage information");
        }
        Ok(options)
    }
}

/// Consumes the argument following the flag at `args[*i]`.
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v.as_str()),
        None => bail!("{} requires an argument", flag),
    }
}

fn print_help(program: &str) {
    eprintln!("overtone-roll - MIDI timeline and overtone inspector");
    eprintln!();
    eprintln!("Usage: {} [FILE.mid] [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config PATH       Load document settings from a JSON file");
    eprintln!("  -m, --merge GROUPING    Merge tracks by 'all', 'instrument' or 'type'");
    eprintln!("  -o, --overtones PITCH   Print the harmonic series of PITCH (e.g. C2)");
    eprintln!("      --limit HZ          Highest overtone frequency (default {})", DEFAULT_OVERTONE_LIMIT);
    eprintln!("      --json              Print the bar timeline as JSON");
    eprintln!("  -h, --help              Print this help message");
}

fn print_document(doc: &MidiDocument) {
    let title = if doc.title().is_empty() { "(untitled)" } else { doc.title() };
    println!("{}", title);
    println!("{} bars, {} beats", doc.timeline().len(), doc.total_beats());
    println!();

    let tpb = doc.ticks_per_beat().unwrap_or_default();
    println!("  bar      tick   time(s)  beat  sig    bpm  key");
    let mut seconds = 0.0;
    for bar in doc.timeline().bars() {
        println!(
            "{:>5} {:>9} {:>9.2} {:>5}  {:>2}/{:<2} {:>4}  {}",
            bar.bar,
            bar.global_time,
            seconds,
            bar.global_beat,
            bar.time_sig_numerator,
            bar.time_sig_denominator,
            bar.bpm,
            bar.key_signature
        );
        seconds += ticks_to_seconds(bar.ticks, tpb, bar.tempo);
    }
    println!();

    println!("Tracks:");
    for track in doc.tracks() {
        let instrument = track
            .program()
            .map_or_else(|| "(no program)".to_string(), |p| p.to_string());
        let range = match (
            track.notes().iter().map(|n| n.pitch).min(),
            track.notes().iter().map(|n| n.pitch).max(),
        ) {
            (Some(low), Some(high)) => format!("{}-{}", note_to_name(low), note_to_name(high)),
            _ => "-".to_string(),
        };
        println!(
            "  [{}] {:<24} {:<36} {:<7} {:>5} notes  {}",
            track.id().as_u64(),
            track.name(),
            instrument,
            track.color(),
            track.note_count(),
            range
        );
        if track.dropped_notes() > 0 {
            println!("      {} unterminated notes dropped", track.dropped_notes());
        }
    }
}

fn print_overtones(pitch: &str, limit: f64) -> Result<()> {
    let series = OvertoneSequence::from_scientific(pitch, limit)
        .with_context(|| format!("Cannot build overtone series for {}", pitch))?;

    println!("Overtones of {} ({:.2} Hz) up to {} Hz:", pitch, series.fundamental(), limit);
    for (k, overtone) in series.iter().enumerate() {
        let nearest = overtone
            .closest_pitch()
            .map_or_else(|| format!("midi {}", overtone.nearest_midi()), |p| p.to_string());
        println!(
            "{:>4} {:>10.2} Hz  {:<6} {:+4} cents",
            k + 1,
            overtone.frequency(),
            nearest,
            overtone.cents()
        );
    }
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => DocumentConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => DocumentConfig::default(),
    };

    if let Some(path) = &cli.file {
        let mut doc = MidiDocument::new(config);
        doc.load_file(path)
            .with_context(|| format!("Failed to load MIDI file: {}", path.display()))?;

        if let Some(grouping) = cli.merge {
            let merged = doc.merge_by(grouping);
            tracing::info!("Merged {} track groups", merged);
        }

        if cli.json {
            let json = serde_json::to_string_pretty(doc.timeline())
                .context("Failed to serialize timeline")?;
            println!("{}", json);
        } else {
            print_document(&doc);
        }
    }

    if let Some(pitch) = &cli.overtones {
        if cli.file.is_some() {
            println!();
        }
        print_overtones(pitch, cli.limit)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_consumes_next_argument() {
        let args: Vec<String> = ["prog", "--limit", "880"].iter().map(|s| s.to_string()).collect();
        let mut i = 1;
        assert_eq!(value(&args, &mut i, "--limit").unwrap(), "880");
        assert_eq!(i, 2);
        assert!(value(&args, &mut i, "--limit").is_err());
    }
}
