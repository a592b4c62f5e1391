//! soundseq - Play a short demo phrase through a SoundFont.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --soundfont FluidR3_GM.sf2           # Play the demo
//! cargo run -- FluidR3_GM.sf2 --export demo.wav     # Bounce it to WAV
//! cargo run -- --list-presets                       # List presets
//! ```
//!
//! Without `--soundfont`, the SoundFont comes from the config file, the
//! `SOUNDSEQ_SOUNDFONT` environment variable, or discovery.

use anyhow::{bail, Context, Result};
use soundseq::{soundfont, Player, Settings};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// Path to a SoundFont file.
    soundfont: Option<PathBuf>,
    /// Output gain override.
    gain: Option<f32>,
    /// Render to this WAV file instead of playing.
    export: Option<PathBuf>,
    /// Print the SoundFont's presets and exit.
    list_presets: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--soundfont <path>` or `-sf <path>`: SoundFont file to load
    /// - `--gain <value>`: Output gain (0.0 - 2.0)
    /// - `--export <path>`: Write a WAV file instead of playing
    /// - `--list-presets`: Print presets and exit
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            soundfont: None,
            gain: None,
            export: None,
            list_presets: false,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--soundfont" | "-sf" => {
                    i += 1;
                    let path = args.get(i).context("--soundfont requires a path argument")?;
                    options.soundfont = Some(PathBuf::from(path));
                }
                "--gain" => {
                    i += 1;
                    let value = args.get(i).context("--gain requires a value")?;
                    options.gain = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid gain: {}", value))?,
                    );
                }
                "--export" => {
                    i += 1;
                    let path = args.get(i).context("--export requires a path argument")?;
                    options.export = Some(PathBuf::from(path));
                }
                "--list-presets" => options.list_presets = true,
                "--help" | "-h" => {
                    eprintln!("soundseq - SoundFont sequencer demo");
                    eprintln!();
                    eprintln!("Usage: soundseq [OPTIONS] [SOUNDFONT.sf2]");
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -sf, --soundfont PATH  Load a specific SoundFont file (.sf2)");
                    eprintln!("  --gain VALUE           Output gain, 0.0 - 2.0 (default 1.0)");
                    eprintln!("  --export PATH          Render the demo to a WAV file");
                    eprintln!("  --list-presets         List the SoundFont's presets");
                    eprintln!("  -h, --help             Print this help message");
                    std::process::exit(0);
                }
                other if other.to_ascii_lowercase().ends_with(".sf2") => {
                    options.soundfont = Some(PathBuf::from(other));
                }
                other => bail!("Unknown option: {} (use --help for usage)", other),
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Schedules a short phrase: an arpeggio, then a held chord.
fn schedule_demo(player: &mut Player) {
    const BEAT: f64 = 0.25;
    player.schedule_program(0, 0, 0.0);

    // C major arpeggio up and down
    let keys = [60, 64, 67, 72, 76, 72, 67, 64];
    for (i, key) in keys.iter().enumerate() {
        player.schedule_note(0, *key, 0.8, i as f64 * BEAT, BEAT * 0.9);
    }

    // Final chord
    let chord_start = keys.len() as f64 * BEAT;
    for key in [48, 60, 64, 67] {
        player.schedule_note(0, key, 0.7, chord_start, BEAT * 4.0);
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load().context("Failed to load settings")?;

    // Determine which SoundFont to use:
    // 1. CLI-specified SoundFont takes priority
    // 2. Config file / SOUNDSEQ_SOUNDFONT
    // 3. Discovery in the usual directories
    let soundfont_path = cli
        .soundfont
        .clone()
        .or_else(|| settings.soundfont.clone())
        .or_else(|| soundfont::find_soundfont(settings.soundfont_dir.as_deref()))
        .context("No SoundFont found. Pass --soundfont PATH or set SOUNDSEQ_SOUNDFONT")?;

    let mut player = Player::with_config(settings.player.clone());
    player
        .load(&soundfont_path)
        .with_context(|| format!("Failed to load SoundFont: {}", soundfont_path.display()))?;
    if let Some(gain) = cli.gain {
        player.set_gain(gain);
    }

    if cli.list_presets {
        for (i, name) in player.presets().iter().enumerate() {
            println!("{:4}  {}", i, name);
        }
        return Ok(());
    }

    schedule_demo(&mut player);

    if let Some(output) = cli.export {
        let frames = player
            .export_wav(&output)
            .with_context(|| format!("Failed to export WAV: {}", output.display()))?;
        eprintln!(
            "Wrote {:.2}s to {}",
            frames as f64 / settings.player.sample_rate as f64,
            output.display()
        );
        return Ok(());
    }

    player.play().context("Failed to start playback")?;
    player.wait(Duration::from_millis(50));
    player.stop();

    Ok(())
}
