//! Player configuration.
//!
//! Settings are read from a JSON file, looked up in priority order:
//!
//! 1. `./soundseq.json` (project-local)
//! 2. `~/.soundseq/config.json` (user)
//!
//! The first file found wins; missing fields take their defaults. The
//! `SOUNDSEQ_SOUNDFONT` environment variable overrides the file's SoundFont.
//!
//! ```json
//! {
//!   "soundfont": "~/Music/sf2/FluidR3_GM.sf2",
//!   "player": { "gain": 0.8, "period_frames": 256 }
//! }
//! ```

use crate::audio::{DEFAULT_GAIN, PERIOD_FRAMES, SAMPLE_RATE, TAIL_SECONDS};
use crate::audio::synth::DEFAULT_BLOCK_SIZE;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a SoundFont file.
pub const SOUNDFONT_ENV_VAR: &str = "SOUNDSEQ_SOUNDFONT";

/// File name of the project-local config.
pub const LOCAL_CONFIG_FILE: &str = "soundseq.json";

/// Playback engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output sample rate in Hz. The clock advances `1 / sample_rate` per frame.
    pub sample_rate: u32,

    /// Frames the device requests per callback.
    /// Smaller = lower latency but higher CPU usage.
    pub period_frames: usize,

    /// Seconds to keep rendering after the last note-off so releases ring out.
    pub tail_seconds: f64,

    /// Initial output gain, clamped to `[0.0, 2.0]`.
    pub gain: f32,

    /// rustysynth internal block size in frames.
    pub synth_block_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            period_frames: PERIOD_FRAMES,
            tail_seconds: TAIL_SECONDS,
            gain: DEFAULT_GAIN,
            synth_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Everything read from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SoundFont to load. `~` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soundfont: Option<PathBuf>,

    /// Directory searched first during SoundFont discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soundfont_dir: Option<PathBuf>,

    pub player: PlayerConfig,
}

impl Settings {
    /// Loads settings from the first config file found, then applies the
    /// environment override. Returns defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match config_paths().into_iter().next() {
            Some(path) => {
                tracing::info!("Loading config from {:?}", path);
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.apply_env_override(std::env::var(SOUNDFONT_ENV_VAR).ok());
        Ok(settings)
    }

    /// Reads a single JSON settings file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.soundfont = settings.soundfont.map(expand_home);
        settings.soundfont_dir = settings.soundfont_dir.map(expand_home);
        Ok(settings)
    }

    fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.soundfont = Some(expand_home(PathBuf::from(value)));
        }
    }
}

/// Existing config files in priority order (highest first).
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(LOCAL_CONFIG_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".soundseq").join("config.json"));
    }
    paths.retain(|p| p.is_file());
    paths
}

/// Expands a leading `~` to the home directory.
pub(crate) fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.tail_seconds, 0.5);
        assert_eq!(config.gain, 1.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "player": { "gain": 0.5 } }"#).unwrap();
        assert_eq!(settings.soundfont, None);
        assert_eq!(settings.player.gain, 0.5);
        assert_eq!(settings.player.sample_rate, SAMPLE_RATE);
        assert_eq!(settings.player.period_frames, PERIOD_FRAMES);
    }

    #[test]
    fn test_invalid_json() {
        assert!(Settings::from_json("{ not json").is_err());
    }

    #[test]
    fn test_from_file_errors() {
        let missing = Settings::from_file("no/such/soundseq.json");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2").unwrap();
        let bad = Settings::from_file(file.path());
        assert!(matches!(bad, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_override() {
        let mut settings = Settings::from_json(r#"{ "soundfont": "/a.sf2" }"#).unwrap();
        settings.apply_env_override(None);
        assert_eq!(settings.soundfont, Some(PathBuf::from("/a.sf2")));

        settings.apply_env_override(Some(String::new()));
        assert_eq!(settings.soundfont, Some(PathBuf::from("/a.sf2")));

        settings.apply_env_override(Some("/b.sf2".into()));
        assert_eq!(settings.soundfont, Some(PathBuf::from("/b.sf2")));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(PathBuf::from("/abs/x.sf2")), PathBuf::from("/abs/x.sf2"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(PathBuf::from("~/x.sf2")), home.join("x.sf2"));
        }
    }
}
