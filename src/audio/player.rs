//! The playback controller.
//!
//! [`Player`] is the public control surface. It mutates the shared engine
//! state from the calling thread while the output device pulls audio
//! through a [`RenderEngine`] clone on the audio thread.
//!
//! Operations that touch the device or the SoundFont (`load`, `play`,
//! `stop`) take `&mut self`, so they are serialized by ownership rather
//! than by the render lock.

use super::device::{AudioDevice, DeviceConfig, OutputBackend, RenderCallback, RodioBackend};
use super::export;
use super::render::RenderEngine;
use super::synth::{RustySynthLoader, SoundFontSynth, SynthLoader};
use super::{clamp_gain, CHANNELS};
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// SoundFont sequencer with real-time output.
///
/// Notes and program changes are scheduled at absolute times (seconds),
/// then [`Player::play`] starts the device and renders them with
/// sample-accurate timing. Playback ends on its own once every note has
/// been released and the release tail has elapsed.
///
/// # Examples
///
/// ```no_run
/// use soundseq::Player;
///
/// let mut player = Player::new();
/// player.load("FluidR3_GM.sf2")?;
/// player.schedule_program(0, 0, 0.0);
/// player.schedule_note(0, 60, 0.8, 0.0, 0.5);
/// player.schedule_note(0, 64, 0.8, 0.5, 0.5);
/// player.play()?;
/// player.wait(std::time::Duration::from_millis(50));
/// # Ok::<(), soundseq::PlayerError>(())
/// ```
pub struct Player<L: SynthLoader = RustySynthLoader, B: OutputBackend = RodioBackend> {
    loader: L,
    backend: B,
    engine: RenderEngine<L::Synth>,
    /// Opened lazily by the first `play()`; released on drop.
    device: Option<B::Device>,
    config: PlayerConfig,
    soundfont_path: Option<PathBuf>,
}

impl Player {
    /// Creates a player on rustysynth and the default rodio output.
    pub fn new() -> Self {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let loader = RustySynthLoader::new(config.synth_block_size);
        Self::with_backends(loader, RodioBackend, config)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: SynthLoader, B: OutputBackend> Player<L, B> {
    /// Creates a player over explicit synth and output backends.
    pub fn with_backends(loader: L, backend: B, config: PlayerConfig) -> Self {
        let gain = clamp_gain(config.gain);
        let engine = RenderEngine::new(config.sample_rate, config.tail_seconds, gain);
        Self {
            loader,
            backend,
            engine,
            device: None,
            config: PlayerConfig { gain, ..config },
            soundfont_path: None,
        }
    }

    /// Loads a SoundFont, replacing any previously loaded one.
    ///
    /// Any in-progress playback is stopped first. On failure the player is
    /// left unloaded.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not a SoundFont, or the
    /// synthesizer rejects the output configuration.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), PlayerError> {
        let path = path.as_ref();
        self.stop();
        self.engine.lock().synth = None;
        self.soundfont_path = None;

        // Parse outside the lock; the audio thread renders silence meanwhile.
        let mut synth = self.loader.load(path, self.config.sample_rate).map_err(|e| {
            tracing::error!("Failed to load SoundFont {:?}: {}", path, e);
            e
        })?;

        let mut state = self.engine.lock();
        synth.set_output(self.config.sample_rate, state.gain)?;
        tracing::info!(
            "Loaded SoundFont {:?} ({} presets)",
            path,
            synth.preset_count()
        );
        state.synth = Some(synth);
        drop(state);

        self.soundfont_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.lock().synth.is_some()
    }

    /// Path of the loaded SoundFont.
    pub fn soundfont_path(&self) -> Option<&Path> {
        self.soundfont_path.as_deref()
    }

    /// Number of presets in the loaded SoundFont, or 0 when unloaded.
    pub fn preset_count(&self) -> usize {
        self.engine
            .lock()
            .synth
            .as_ref()
            .map_or(0, |s| s.preset_count())
    }

    /// Name of the preset at `index`. Empty when out of range or unloaded.
    pub fn preset_name(&self, index: usize) -> String {
        self.engine
            .lock()
            .synth
            .as_ref()
            .and_then(|s| s.preset_name(index))
            .unwrap_or_default()
    }

    /// Names of every preset, in index order.
    pub fn presets(&self) -> Vec<String> {
        let state = self.engine.lock();
        let Some(synth) = state.synth.as_ref() else {
            return Vec::new();
        };
        (0..synth.preset_count())
            .map(|i| synth.preset_name(i).unwrap_or_default())
            .collect()
    }

    /// Sets the output gain, clamped to `[0.0, 2.0]`.
    ///
    /// Takes effect immediately when a SoundFont is loaded.
    pub fn set_gain(&mut self, gain: f32) {
        let gain = clamp_gain(gain);
        let mut state = self.engine.lock();
        state.gain = gain;
        if let Some(synth) = state.synth.as_mut() {
            if let Err(e) = synth.set_output(self.config.sample_rate, gain) {
                tracing::warn!("Failed to apply gain {}: {}", gain, e);
            }
        }
        self.config.gain = gain;
    }

    /// Effective (clamped) output gain.
    pub fn gain(&self) -> f32 {
        self.engine.lock().gain
    }

    /// Schedules a preset change on `channel` at `time` seconds.
    ///
    /// `program` is an index into the SoundFont's preset list. It is not
    /// validated; the synth ignores indexes it does not have.
    pub fn schedule_program(&mut self, channel: u8, program: usize, time: f64) {
        tracing::debug!("Schedule program {} on channel {} at {:.3}s", program, channel, time);
        self.engine.lock().schedule.add_program(channel, program, time);
    }

    /// Schedules a note.
    ///
    /// # Arguments
    ///
    /// * `channel` - Synth channel
    /// * `key` - MIDI key number (60 = Middle C)
    /// * `velocity` - Normalized velocity, clamped to `[0.0, 1.0]`
    /// * `start_time` - Note-on time in seconds
    /// * `duration` - Length in seconds. Zero or negative plays a note-on
    ///   immediately followed by its note-off.
    pub fn schedule_note(
        &mut self,
        channel: u8,
        key: u8,
        velocity: f32,
        start_time: f64,
        duration: f64,
    ) {
        tracing::debug!(
            "Schedule note {} on channel {} at {:.3}s for {:.3}s",
            key,
            channel,
            start_time,
            duration
        );
        self.engine
            .lock()
            .schedule
            .add_note(channel, key, velocity, start_time, duration);
    }

    /// Removes every scheduled event and rewinds the clock.
    ///
    /// Does not stop the device.
    pub fn clear_schedule(&mut self) {
        let mut state = self.engine.lock();
        state.schedule.clear();
        state.clock.reset();
    }

    /// Latest scheduled note end, in seconds. 0.0 when nothing is scheduled.
    pub fn duration(&self) -> f64 {
        self.engine.lock().schedule.duration()
    }

    /// Starts playback from time zero.
    ///
    /// Opens the output device on first use. Already playing is a no-op
    /// that succeeds without rewinding.
    ///
    /// # Errors
    ///
    /// Returns error if no SoundFont is loaded or the device cannot be
    /// opened or started. Playback is not running afterwards.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        {
            let state = self.engine.lock();
            if state.synth.is_none() {
                return Err(PlayerError::NotLoaded);
            }
            if state.playing {
                return Ok(());
            }
        }

        let device = match self.device.take() {
            Some(device) => device,
            None => self.open_device()?,
        };
        let device = self.device.insert(device);

        {
            let mut state = self.engine.lock();
            state.rewind();
            state.playing = true;
        }

        if let Err(e) = device.start() {
            tracing::error!("Failed to start playback: {}", e);
            self.engine.lock().playing = false;
            return Err(e.into());
        }

        tracing::info!("Playback started ({:.3}s scheduled)", self.duration());
        Ok(())
    }

    fn open_device(&self) -> Result<B::Device, PlayerError> {
        let config = DeviceConfig {
            sample_rate: self.config.sample_rate,
            channels: CHANNELS,
            period_frames: self.config.period_frames,
        };
        let engine = self.engine.clone();
        let callback: RenderCallback = Box::new(move |out: &mut [f32]| engine.render(out));

        self.backend.open(config, callback).map_err(|e| {
            tracing::error!("Failed to open audio output: {}", e);
            PlayerError::from(e)
        })
    }

    /// Stops the device and cuts every sounding voice. Safe to call when
    /// already stopped.
    pub fn stop(&mut self) {
        if let Some(device) = self.device.as_mut() {
            device.stop();
        }

        let mut state = self.engine.lock();
        if let Some(synth) = state.synth.as_mut() {
            synth.note_off_all();
        }
        if state.playing {
            tracing::info!("Playback stopped at {:.3}s", state.clock.now());
        }
        state.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Playback position in seconds.
    pub fn current_time(&self) -> f64 {
        self.engine.current_time()
    }

    /// Blocks until playback completes, checking every `poll_interval`.
    pub fn wait(&self, poll_interval: Duration) {
        while self.is_playing() {
            thread::sleep(poll_interval);
        }
    }

    /// Renders the current schedule offline to a 16-bit stereo WAV file.
    ///
    /// Uses a fresh synthesizer loaded from the same SoundFont, so a
    /// running real-time playback is not disturbed. Returns the number of
    /// frames written.
    ///
    /// # Errors
    ///
    /// Returns error if no SoundFont is loaded, it can no longer be read,
    /// or the WAV file cannot be written.
    pub fn export_wav(&self, output_path: impl AsRef<Path>) -> Result<u64, PlayerError> {
        let soundfont_path = self.soundfont_path.as_ref().ok_or(PlayerError::NotLoaded)?;
        let mut synth = self.loader.load(soundfont_path, self.config.sample_rate)?;

        let (schedule, gain) = {
            let state = self.engine.lock();
            (state.schedule.clone(), state.gain)
        };
        synth.set_output(self.config.sample_rate, gain)?;

        let config = PlayerConfig {
            gain,
            ..self.config.clone()
        };
        export::render_to_wav(synth, schedule, &config, output_path, None::<fn(f32)>)
    }
}

impl<L: SynthLoader, B: OutputBackend> Drop for Player<L, B> {
    fn drop(&mut self) {
        self.stop();
        // Release the device before the engine it renders from.
        self.device = None;
    }
}
