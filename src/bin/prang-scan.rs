//! Lists the MIDI files in a directory with their format, track count and
//! tempo, the way the device's file picker shows them.

use clap::Parser;
use prang::{Catalog, CatalogEntry, Result, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prang-scan", version, about)]
struct Args {
    /// Directory to scan
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Settings file to report alongside the listing
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Remove the settings file before reading it
    #[arg(long, requires = "settings")]
    reset_settings: bool,
}

fn describe(entry: &CatalogEntry) -> String {
    let meta = &entry.metadata;
    format!(
        "{}  type {}  {} tracks  tempo: {}",
        entry.file_name(),
        meta.format.as_raw(),
        meta.track_count,
        meta.tempo()
    )
}

fn describe_settings(settings: &Settings) -> String {
    let quantize = match settings.quantize_beats {
        0 => "off".to_string(),
        beats => format!("{beats} beats"),
    };
    format!(
        "base octave {} (note {})  quantize {}",
        settings.base_octave,
        settings.base_note(),
        quantize
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();

    if let Some(path) = &args.settings {
        if args.reset_settings && Settings::reset(path)? {
            eprintln!("removed {}", path.display());
        }
        let settings = Settings::load(path)?.unwrap_or_default();
        println!("{}", describe_settings(&settings));
    }

    let catalog = Catalog::scan_dir(&args.dir)?;
    for entry in catalog.entries() {
        println!("{}", describe(entry));
    }
    for skipped in catalog.skipped() {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.error);
    }
    if catalog.is_empty() {
        eprintln!("no playable MIDI files in {}", args.dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prang::smf::{Division, FileMetadata, SmfFormat, TEMPO_VARIES};

    fn entry(name: &str, format: SmfFormat, tracks: u16, micro_tempo: u32) -> CatalogEntry {
        CatalogEntry {
            path: PathBuf::from("/songs").join(name),
            metadata: FileMetadata {
                format,
                track_count: tracks,
                micro_tempo,
                division: Division::TicksPerQuarter(480),
            },
        }
    }

    #[test]
    fn test_describe_fixed_tempo() {
        let line = describe(&entry("groove.mid", SmfFormat::Parallel, 9, 428_571));
        insta::assert_snapshot!(line, @"groove.mid  type 1  9 tracks  tempo: 140.0");
    }

    #[test]
    fn test_describe_varying_tempo() {
        let line = describe(&entry("RUBATO.MIDI", SmfFormat::SingleTrack, 1, TEMPO_VARIES));
        insta::assert_snapshot!(line, @"RUBATO.MIDI  type 0  1 tracks  tempo: varies");
    }

    #[test]
    fn test_describe_settings() {
        insta::assert_snapshot!(
            describe_settings(&Settings::default()),
            @"base octave 4 (note 48)  quantize 4 beats"
        );
        let off = Settings {
            base_octave: 0,
            quantize_beats: 0,
        };
        insta::assert_snapshot!(describe_settings(&off), @"base octave 0 (note 0)  quantize off");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["prang-scan", "/songs", "--settings", "/prang.csv"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("/songs"));
        assert!(!args.reset_settings);
        assert!(Args::try_parse_from(["prang-scan", "--reset-settings"]).is_err());
    }
}
