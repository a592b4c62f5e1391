//! Offline WAV export.
//!
//! Bounces a schedule to a WAV file by driving the same render engine the
//! output device uses, as fast as the CPU allows. Playback ends the same
//! way it does in real time: after the release tail.

use super::render::RenderEngine;
use super::synth::SoundFontSynth;
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::sequence::Schedule;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Frames per render call.
/// Larger buffers are more efficient but delay completion detection.
const RENDER_BUFFER_FRAMES: usize = 4096;

/// Extra time rendered past the last event before giving up on completion.
const EXPORT_MARGIN_SECONDS: f64 = 1.0;

/// Renders `schedule` through `synth` into a 16-bit stereo WAV file.
///
/// # Arguments
///
/// * `synth` - A freshly loaded synthesizer, already configured for output
/// * `schedule` - Events to render; their playback states are rewound first
/// * `config` - Sample rate, tail length and gain
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Returns
///
/// The number of frames written.
///
/// # Errors
///
/// Returns error if the output file cannot be created or written.
pub fn render_to_wav<S, P, F>(
    synth: S,
    schedule: Schedule,
    config: &PlayerConfig,
    output_path: P,
    mut progress_callback: Option<F>,
) -> Result<u64, PlayerError>
where
    S: SoundFontSynth,
    P: AsRef<Path>,
    F: FnMut(f32),
{
    let sample_rate = config.sample_rate;
    // Stops rendering even if some note can never fire (e.g. a NaN start).
    let max_seconds = schedule.latest_event_time() + config.tail_seconds + EXPORT_MARGIN_SECONDS;
    let max_frames = (max_seconds * sample_rate as f64).ceil() as u64;

    let engine = RenderEngine::with_schedule(
        Some(synth),
        schedule,
        sample_rate,
        config.tail_seconds,
        config.gain,
    );
    {
        let mut state = engine.lock();
        state.rewind();
        state.playing = true;
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output_path.as_ref(), spec)?;

    let mut buffer = vec![0.0f32; RENDER_BUFFER_FRAMES * 2];
    let mut written = 0u64;

    while engine.is_playing() && written < max_frames {
        let frames = (max_frames - written).min(RENDER_BUFFER_FRAMES as u64) as usize;
        let buffer = &mut buffer[..frames * 2];
        engine.render(buffer);

        // Convert f32 (-1.0 to 1.0) to i16
        for sample in buffer.iter() {
            writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
        }

        written += frames as u64;
        if let Some(ref mut callback) = progress_callback {
            callback(written as f32 / max_frames as f32);
        }
    }

    writer.finalize()?;
    tracing::info!(
        "Exported {:.2}s of audio to {:?}",
        written as f64 / sample_rate as f64,
        output_path.as_ref()
    );

    Ok(written)
}
