//! Audio output devices.
//!
//! A device pulls fixed-size buffers of interleaved stereo samples from a
//! caller-supplied [`RenderCallback`] on its own thread. The production
//! backend drives the callback from a rodio [`Source`].

use crate::error::DeviceError;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::time::Duration;

/// Fills one buffer of interleaved samples. Invoked on the audio thread.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Output stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u16,
    /// Frames requested from the callback per invocation.
    pub period_frames: usize,
}

/// An opened output stream. Dropping it releases the device.
pub trait AudioDevice {
    /// Starts (or resumes) pulling audio from the callback. Starting an
    /// already running device succeeds.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Stops pulling audio. Stopping a stopped device is a no-op.
    fn stop(&mut self);
}

/// Opens output devices.
pub trait OutputBackend {
    type Device: AudioDevice;

    /// Opens a stopped device that will invoke `callback` once started.
    fn open(&self, config: DeviceConfig, callback: RenderCallback)
        -> Result<Self::Device, DeviceError>;
}

/// Endless source that pulls period-sized buffers from a render callback.
/// Implements rodio's Source trait for playback.
struct CallbackSource {
    callback: RenderCallback,
    /// One period of interleaved samples.
    buffer: Vec<f32>,
    /// Read position within the buffer.
    pos: usize,
    channels: u16,
    sample_rate: u32,
}

impl CallbackSource {
    fn new(config: DeviceConfig, callback: RenderCallback) -> Self {
        let len = config.period_frames.max(1) * config.channels.max(1) as usize;
        Self {
            callback,
            buffer: vec![0.0; len],
            pos: len, // Start at end to trigger first render
            channels: config.channels.max(1),
            sample_rate: config.sample_rate,
        }
    }
}

impl Iterator for CallbackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.buffer.len() {
            (self.callback)(&mut self.buffer);
            self.pos = 0;
        }
        let sample = self.buffer[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for CallbackSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// The system's default output device, opened through rodio.
pub struct RodioDevice {
    /// Controls the callback source. Paused while the device is stopped.
    sink: Sink,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

impl AudioDevice for RodioDevice {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.sink.play();
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.pause();
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

/// Opens [`RodioDevice`]s on the default output.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioBackend;

impl OutputBackend for RodioBackend {
    type Device = RodioDevice;

    fn open(
        &self,
        config: DeviceConfig,
        callback: RenderCallback,
    ) -> Result<RodioDevice, DeviceError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| DeviceError::Open(e.to_string()))?;
        let sink = Sink::try_new(&stream_handle).map_err(|e| DeviceError::Open(e.to_string()))?;

        // Queue the source paused so nothing is pulled before start().
        sink.pause();
        sink.append(CallbackSource::new(config, callback));

        Ok(RodioDevice {
            sink,
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config() -> DeviceConfig {
        DeviceConfig {
            sample_rate: 44100,
            channels: 2,
            period_frames: 4,
        }
    }

    #[test]
    fn test_callback_source_pulls_whole_periods() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: RenderCallback = Box::new(move |buf: &mut [f32]| {
            let n = counter.fetch_add(1, Ordering::Relaxed) as f32;
            assert_eq!(buf.len(), 8);
            buf.fill(n);
        });

        let mut source = CallbackSource::new(config(), callback);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 44100);
        assert_eq!(source.total_duration(), None);

        let first: Vec<f32> = source.by_ref().take(8).collect();
        assert_eq!(first, vec![0.0; 8]);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        assert_eq!(source.next(), Some(1.0));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    #[ignore] // Requires an audio output device
    fn test_rodio_device_lifecycle() {
        let callback: RenderCallback = Box::new(|buf: &mut [f32]| buf.fill(0.0));
        let mut device = RodioBackend.open(config(), callback).unwrap();
        device.start().unwrap();
        device.start().unwrap();
        device.stop();
        device.stop();
    }
}
