//! Audio engine for scheduled SoundFont playback.
//!
//! This module provides sample-accurate sequencing on top of a SoundFont
//! synthesizer (rustysynth) and an output device (rodio). It supports:
//! - Loading SoundFont files and introspecting their presets
//! - Scheduling notes and program changes at absolute times
//! - Real-time playback with automatic completion after a release tail
//! - Offline WAV export

pub mod device;
pub mod export;
pub mod player;
pub mod render;
pub mod synth;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{AudioDevice, DeviceConfig, OutputBackend, RenderCallback, RodioBackend};
pub use export::render_to_wav;
pub use player::Player;
pub use render::RenderEngine;
pub use synth::{RustySynth, RustySynthLoader, SoundFontSynth, SynthLoader};

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Output is always interleaved stereo.
pub const CHANNELS: u16 = 2;

/// Device buffer size in frames for low-latency playback.
pub const PERIOD_FRAMES: usize = 512;

/// Release tail after the last note-off, in seconds.
pub const TAIL_SECONDS: f64 = 0.5;

pub const DEFAULT_GAIN: f32 = 1.0;

pub const MAX_GAIN: f32 = 2.0;

/// Clamps a gain to `[0.0, MAX_GAIN]`. NaN becomes silence.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, MAX_GAIN)
    }
}
