//! Test doubles for the synth and output seams.
//!
//! [`MockSynth`] records every call stamped with the frame it happened
//! on. [`MockBackend`] keeps the render callback so tests can pump the
//! engine by hand, as a device would.

use super::device::{AudioDevice, DeviceConfig, OutputBackend, RenderCallback};
use super::synth::{SoundFontSynth, SynthLoader};
use crate::error::{DeviceError, SynthError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Value the mock writes for every sample while any voice is sounding.
pub const SIGNAL: f32 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub enum SynthCall {
    SetOutput { sample_rate: u32, gain: f32 },
    Reset,
    SetPreset { channel: u8, preset: usize },
    NoteOn { channel: u8, key: u8, velocity: f32 },
    NoteOff { channel: u8, key: u8 },
    NoteOffAll,
}

#[derive(Debug, Default)]
pub struct SynthLog {
    /// Calls paired with the number of frames rendered before them.
    pub calls: Vec<(u64, SynthCall)>,
    pub rendered_frames: u64,
    pub panic_on_render: bool,
    /// Gain from the most recent `set_output`.
    pub gain: Option<f32>,
    /// Sample rate passed to the most recent `MockLoader::load`.
    pub loaded_sample_rate: Option<u32>,
}

impl SynthLog {
    /// Calls made while frame `frame` was being prepared.
    pub fn calls_at(&self, frame: u64) -> Vec<SynthCall> {
        self.calls
            .iter()
            .filter(|(f, _)| *f == frame)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn note_calls(&self) -> Vec<SynthCall> {
        self.calls
            .iter()
            .filter(|(_, c)| matches!(c, SynthCall::NoteOn { .. } | SynthCall::NoteOff { .. }))
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn count(&self, call: &SynthCall) -> usize {
        self.calls.iter().filter(|(_, c)| c == call).count()
    }
}

pub type SharedLog = Arc<Mutex<SynthLog>>;

pub struct MockSynth {
    presets: Vec<String>,
    voices: HashSet<(u8, u8)>,
    log: SharedLog,
}

impl MockSynth {
    pub fn new(presets: &[&str]) -> Self {
        Self::with_log(presets, SharedLog::default())
    }

    pub fn with_log(presets: &[&str], log: SharedLog) -> Self {
        Self {
            presets: presets.iter().map(|p| p.to_string()).collect(),
            voices: HashSet::new(),
            log,
        }
    }

    pub fn log(&self) -> SharedLog {
        Arc::clone(&self.log)
    }

    fn record(&self, call: SynthCall) {
        let mut log = self.log.lock().unwrap();
        let frame = log.rendered_frames;
        log.calls.push((frame, call));
    }
}

impl SoundFontSynth for MockSynth {
    fn preset_count(&self) -> usize {
        self.presets.len()
    }

    fn preset_name(&self, index: usize) -> Option<String> {
        self.presets.get(index).cloned()
    }

    fn set_output(&mut self, sample_rate: u32, gain: f32) -> Result<(), SynthError> {
        self.log.lock().unwrap().gain = Some(gain);
        self.record(SynthCall::SetOutput { sample_rate, gain });
        Ok(())
    }

    fn reset(&mut self) {
        self.voices.clear();
        self.record(SynthCall::Reset);
    }

    fn channel_set_preset(&mut self, channel: u8, preset: usize) {
        self.record(SynthCall::SetPreset { channel, preset });
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: f32) {
        self.voices.insert((channel, key));
        self.record(SynthCall::NoteOn {
            channel,
            key,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        self.voices.remove(&(channel, key));
        self.record(SynthCall::NoteOff { channel, key });
    }

    fn note_off_all(&mut self) {
        self.voices.clear();
        self.record(SynthCall::NoteOffAll);
    }

    fn render(&mut self, out: &mut [f32]) {
        // Read the flag and release the log before panicking.
        let should_panic = self.log.lock().unwrap().panic_on_render;
        if should_panic {
            panic!("mock render fault");
        }

        let value = if self.voices.is_empty() { 0.0 } else { SIGNAL };
        out.fill(value);
        self.log.lock().unwrap().rendered_frames += (out.len() / 2) as u64;
    }
}

/// Loads [`MockSynth`]s for a fixed set of known paths.
pub struct MockLoader {
    known: Vec<PathBuf>,
    presets: Vec<&'static str>,
    /// Log shared by every synth this loader creates.
    pub log: SharedLog,
}

impl MockLoader {
    pub fn new(known: &[&str], presets: &[&'static str]) -> Self {
        Self {
            known: known.iter().map(PathBuf::from).collect(),
            presets: presets.to_vec(),
            log: SharedLog::default(),
        }
    }
}

impl SynthLoader for MockLoader {
    type Synth = MockSynth;

    fn load(&self, path: &Path, sample_rate: u32) -> Result<MockSynth, SynthError> {
        if !self.known.iter().any(|p| p == path) {
            return Err(SynthError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.log.lock().unwrap().loaded_sample_rate = Some(sample_rate);
        Ok(MockSynth::with_log(&self.presets, Arc::clone(&self.log)))
    }
}

#[derive(Default)]
pub struct DeviceLog {
    pub opened: usize,
    pub config: Option<DeviceConfig>,
    pub running: bool,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub dropped: bool,
}

/// Output backend whose devices are pumped manually.
#[derive(Default, Clone)]
pub struct MockBackend {
    pub log: Arc<Mutex<DeviceLog>>,
    callback: Arc<Mutex<Option<RenderCallback>>>,
    pub fail_open: bool,
    pub fail_start: bool,
}

impl MockBackend {
    /// Pulls `frames` stereo frames through the callback, as a running
    /// device would. Returns `None` when no running device exists.
    pub fn pump(&self, frames: usize) -> Option<Vec<f32>> {
        if !self.log.lock().unwrap().running {
            return None;
        }
        let mut callback = self.callback.lock().unwrap();
        let callback = callback.as_mut()?;
        let mut out = vec![1.0f32; frames * 2];
        callback(&mut out);
        Some(out)
    }
}

pub struct MockDevice {
    log: Arc<Mutex<DeviceLog>>,
    fail_start: bool,
}

impl AudioDevice for MockDevice {
    fn start(&mut self) -> Result<(), DeviceError> {
        let mut log = self.log.lock().unwrap();
        log.start_calls += 1;
        if self.fail_start {
            return Err(DeviceError::Start("mock start failure".into()));
        }
        log.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.stop_calls += 1;
        log.running = false;
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.running = false;
        log.dropped = true;
    }
}

impl OutputBackend for MockBackend {
    type Device = MockDevice;

    fn open(
        &self,
        config: DeviceConfig,
        callback: RenderCallback,
    ) -> Result<MockDevice, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::Open("mock open failure".into()));
        }
        {
            let mut log = self.log.lock().unwrap();
            log.opened += 1;
            log.config = Some(config);
        }
        *self.callback.lock().unwrap() = Some(callback);
        Ok(MockDevice {
            log: Arc::clone(&self.log),
            fail_start: self.fail_start,
        })
    }
}
