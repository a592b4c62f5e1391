//! The synthesis primitive.
//!
//! The sequencer only needs a small channel-level surface from a SoundFont
//! synthesizer, captured by [`SoundFontSynth`]. The production backend wraps
//! rustysynth; tests substitute a recording synth.

use crate::error::SynthError;
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// rustysynth's own default master volume. Gain 1.0 maps onto this.
const UNITY_MASTER_VOLUME: f32 = 0.5;

/// General MIDI percussion channel. rustysynth offsets its bank by 128.
const PERCUSSION_CHANNEL: u8 = 9;

/// Default rustysynth block size in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Channel-level control of a loaded SoundFont synthesizer.
///
/// Implementations must tolerate out-of-range channels, keys and preset
/// indexes without panicking; the sequencer forwards them unvalidated.
/// [`SoundFontSynth::render`] runs on the audio thread and must not
/// allocate.
pub trait SoundFontSynth: Send {
    /// Number of presets in the loaded SoundFont.
    fn preset_count(&self) -> usize;

    /// Name of the preset at `index`, if it exists.
    fn preset_name(&self, index: usize) -> Option<String>;

    /// Configures interleaved stereo output at `sample_rate` with a linear
    /// `gain` (1.0 = unity).
    fn set_output(&mut self, sample_rate: u32, gain: f32) -> Result<(), SynthError>;

    /// Silences all voices and resets every channel to its defaults.
    fn reset(&mut self);

    /// Selects the preset at `preset` (an index into the preset list) on `channel`.
    ///
    /// On the General MIDI percussion channel (9) only percussion presets
    /// are selectable with the rustysynth backend.
    fn channel_set_preset(&mut self, channel: u8, preset: usize);

    /// Starts a note. `velocity` is normalized to `[0.0, 1.0]`.
    fn note_on(&mut self, channel: u8, key: u8, velocity: f32);

    /// Releases a note, letting its envelope ring out.
    fn note_off(&mut self, channel: u8, key: u8);

    /// Cuts every sounding voice immediately.
    fn note_off_all(&mut self);

    /// Renders `out.len() / 2` interleaved stereo frames into `out`.
    fn render(&mut self, out: &mut [f32]);
}

/// Opens SoundFont files into synthesizers.
pub trait SynthLoader {
    type Synth: SoundFontSynth + 'static;

    /// Loads the SoundFont at `path` into a synth rendering at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a SoundFont.
    fn load(&self, path: &Path, sample_rate: u32) -> Result<Self::Synth, SynthError>;
}

/// A rustysynth synthesizer behind the [`SoundFontSynth`] surface.
pub struct RustySynth {
    soundfont: Arc<SoundFont>,
    synth: Synthesizer,
    sample_rate: u32,
    block_size: usize,
    /// Scratch buffers for rustysynth's planar output, sized once.
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
}

impl RustySynth {
    /// Creates a synthesizer for an already parsed SoundFont.
    ///
    /// # Errors
    ///
    /// Returns error if rustysynth rejects the sample rate or block size.
    pub fn new(
        soundfont: Arc<SoundFont>,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Self, SynthError> {
        let synth = Self::build(&soundfont, sample_rate, block_size)?;
        Ok(Self {
            soundfont,
            synth,
            sample_rate,
            block_size,
            left_buf: vec![0.0; block_size],
            right_buf: vec![0.0; block_size],
        })
    }

    fn build(
        soundfont: &Arc<SoundFont>,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Synthesizer, SynthError> {
        let mut settings = SynthesizerSettings::new(sample_rate as i32);
        settings.block_size = block_size;
        Synthesizer::new(soundfont, &settings)
            .map_err(|e| SynthError::Synthesizer(format!("{:?}", e)))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SoundFontSynth for RustySynth {
    fn preset_count(&self) -> usize {
        self.soundfont.get_presets().len()
    }

    fn preset_name(&self, index: usize) -> Option<String> {
        self.soundfont
            .get_presets()
            .get(index)
            .map(|p| p.get_name().to_string())
    }

    fn set_output(&mut self, sample_rate: u32, gain: f32) -> Result<(), SynthError> {
        if sample_rate != self.sample_rate {
            self.synth = Self::build(&self.soundfont, sample_rate, self.block_size)?;
            self.sample_rate = sample_rate;
        }
        self.synth.set_master_volume(gain * UNITY_MASTER_VOLUME);
        Ok(())
    }

    fn reset(&mut self) {
        self.synth.reset();
    }

    fn channel_set_preset(&mut self, channel: u8, preset: usize) {
        let Some(preset) = self.soundfont.get_presets().get(preset) else {
            return;
        };
        let patch = preset.get_patch_number();
        let bank = bank_select_value(channel, preset.get_bank_number());
        // Bank select (CC 0) followed by program change (0xC0)
        self.synth.process_midi_message(channel as i32, 0xB0, 0x00, bank);
        self.synth.process_midi_message(channel as i32, 0xC0, patch, 0);
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: f32) {
        let velocity = (velocity.clamp(0.0, 1.0) * 127.0).round() as i32;
        self.synth.note_on(channel as i32, key as i32, velocity);
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        self.synth.note_off(channel as i32, key as i32);
    }

    fn note_off_all(&mut self) {
        self.synth.note_off_all(true);
    }

    fn render(&mut self, out: &mut [f32]) {
        let chunk_len = self.block_size * 2;
        for chunk in out.chunks_mut(chunk_len) {
            let frames = chunk.len() / 2;
            let left = &mut self.left_buf[..frames];
            let right = &mut self.right_buf[..frames];
            self.synth.render(left, right);

            // Interleave: L, R, L, R, ...
            for (i, frame) in chunk.chunks_exact_mut(2).enumerate() {
                frame[0] = left[i];
                frame[1] = right[i];
            }
            if chunk.len() % 2 == 1 {
                chunk[chunk.len() - 1] = 0.0;
            }
        }
    }
}

/// CC 0 value that selects SoundFont bank `bank` on `channel`.
///
/// rustysynth adds 128 to every bank selected on the percussion channel,
/// so the offset is taken back out there. A melodic preset (bank < 128)
/// cannot be reached on channel 9: it resolves to percussion bank 128 +
/// `bank`, and rustysynth falls back to the standard kit when that is
/// missing.
fn bank_select_value(channel: u8, bank: i32) -> i32 {
    if channel == PERCUSSION_CHANNEL {
        (bank - 128).max(0)
    } else {
        bank
    }
}

/// Loads SoundFonts into [`RustySynth`] instances.
#[derive(Debug, Clone, Copy)]
pub struct RustySynthLoader {
    block_size: usize,
}

impl RustySynthLoader {
    /// Creates a loader using the given rustysynth block size.
    ///
    /// Notes triggered between blocks sound from the next block boundary,
    /// so smaller blocks tighten onset timing at some CPU cost.
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Default for RustySynthLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl SynthLoader for RustySynthLoader {
    type Synth = RustySynth;

    fn load(&self, path: &Path, sample_rate: u32) -> Result<RustySynth, SynthError> {
        let file = File::open(path).map_err(|source| SynthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let soundfont =
            SoundFont::new(&mut reader).map_err(|e| SynthError::InvalidSoundFont {
                path: path.to_path_buf(),
                reason: format!("{:?}", e),
            })?;
        RustySynth::new(Arc::new(soundfont), sample_rate, self.block_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SAMPLE_RATE;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_bank_select_value() {
        assert_eq!(bank_select_value(0, 0), 0);
        assert_eq!(bank_select_value(0, 8), 8);
        assert_eq!(bank_select_value(PERCUSSION_CHANNEL, 128), 0);
        assert_eq!(bank_select_value(PERCUSSION_CHANNEL, 129), 1);
        // Melodic banks fold onto the standard percussion bank.
        assert_eq!(bank_select_value(PERCUSSION_CHANNEL, 0), 0);
        assert_eq!(bank_select_value(PERCUSSION_CHANNEL, 8), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let loader = RustySynthLoader::default();
        let result = loader.load(Path::new("definitely/not/here.sf2"), SAMPLE_RATE);
        assert!(matches!(result, Err(SynthError::Io { .. })));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a soundfont").unwrap();

        let result = RustySynthLoader::default().load(file.path(), SAMPLE_RATE);
        assert!(matches!(result, Err(SynthError::InvalidSoundFont { .. })));
    }

    #[test]
    #[ignore] // Requires SoundFont file
    fn test_render_real_soundfont() {
        let sf_path = PathBuf::from("assets/TimGM6mb.sf2");
        let mut synth = RustySynthLoader::default().load(&sf_path, SAMPLE_RATE).unwrap();
        assert!(synth.preset_count() > 0);
        assert!(synth.preset_name(0).is_some());
        assert!(synth.preset_name(synth.preset_count()).is_none());

        synth.set_output(SAMPLE_RATE, 1.0).unwrap();
        synth.channel_set_preset(0, 0);
        synth.note_on(0, 60, 0.8);

        let mut out = vec![0.0f32; 4096 * 2];
        synth.render(&mut out);
        assert!(out.iter().any(|s| *s != 0.0));

        // Out-of-range values are tolerated.
        synth.channel_set_preset(200, usize::MAX);
        synth.note_on(200, 255, 1.0);
        synth.note_off_all();
    }
}
