//! Error types for loading, output, playback control and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the synthesis primitive.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The SoundFont file could not be opened or read.
    #[error("failed to read SoundFont {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not a usable SoundFont.
    #[error("invalid SoundFont {path}: {reason}")]
    InvalidSoundFont { path: PathBuf, reason: String },
    /// The synthesizer rejected its settings.
    #[error("failed to create synthesizer: {0}")]
    Synthesizer(String),
}

/// Errors from the audio output device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open audio output: {0}")]
    Open(String),
    #[error("failed to start audio output: {0}")]
    Start(String),
}

/// Errors surfaced by the playback controller.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no SoundFont loaded")]
    NotLoaded,
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("WAV export failed: {0}")]
    Export(#[from] hound::Error),
}

/// Errors reading a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
