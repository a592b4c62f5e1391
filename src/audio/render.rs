//! The real-time render engine.
//!
//! [`RenderEngine::render`] is called from the audio thread once per
//! device buffer. It holds the shared lock for the whole buffer and walks
//! it frame by frame, firing every event whose time has been reached on
//! the exact frame it becomes due, rendering one stereo frame, and
//! advancing the clock.

use super::synth::SoundFontSynth;
use crate::sequence::{PlaybackClock, Schedule};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State shared between the controller and the audio thread.
pub(crate) struct EngineState<S> {
    /// The loaded synthesizer, if any.
    pub(crate) synth: Option<S>,
    pub(crate) schedule: Schedule,
    pub(crate) clock: PlaybackClock,
    /// Gates rendering. Cleared by `stop()` and by completion detection.
    pub(crate) playing: bool,
    /// Effective output gain in `[0.0, 2.0]`.
    pub(crate) gain: f32,
    /// Time allowed after the last note-off for voices to ring out.
    pub(crate) tail_seconds: f64,
}

impl<S: SoundFontSynth> EngineState<S> {
    /// Rewinds the clock and every event, and silences the synth.
    pub(crate) fn rewind(&mut self) {
        self.clock.reset();
        self.schedule.reset_states();
        if let Some(synth) = self.synth.as_mut() {
            synth.reset();
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        let EngineState {
            synth,
            schedule,
            clock,
            playing,
            ..
        } = self;

        let synth = match synth {
            Some(synth) if *playing => synth,
            _ => {
                out.fill(0.0);
                return;
            }
        };

        let mut frames = out.chunks_exact_mut(2);
        for frame in &mut frames {
            let now = clock.now();

            for pc in schedule.programs_mut() {
                if pc.is_due(now) {
                    synth.channel_set_preset(pc.channel, pc.program);
                    pc.mark_applied();
                }
            }

            for note in schedule.notes_mut() {
                if note.should_start(now) {
                    synth.note_on(note.channel, note.key, note.velocity);
                    note.mark_started();
                }
            }

            // Includes notes started above, so a zero or negative duration
            // still sends its note-on first.
            for note in schedule.notes_mut() {
                if note.should_stop(now) {
                    synth.note_off(note.channel, note.key);
                    note.mark_stopped();
                }
            }

            synth.render(frame);
            clock.advance();
        }
        frames.into_remainder().fill(0.0);

        self.update_completion();
    }

    /// Clears `playing` once there is nothing left to hear.
    fn update_completion(&mut self) {
        if self.schedule.is_empty() {
            self.playing = false;
        } else if self.clock.now() > self.schedule.duration() + self.tail_seconds
            && self.schedule.all_notes_stopped()
        {
            self.playing = false;
        }
    }
}

/// Cloneable handle to the shared engine state.
///
/// One clone lives in the device callback, the other in the controller.
pub struct RenderEngine<S> {
    shared: Arc<Mutex<EngineState<S>>>,
}

impl<S> Clone for RenderEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: SoundFontSynth> RenderEngine<S> {
    /// Creates an idle engine with no synth and an empty schedule.
    pub fn new(sample_rate: u32, tail_seconds: f64, gain: f32) -> Self {
        Self::with_schedule(None, Schedule::new(), sample_rate, tail_seconds, gain)
    }

    pub(crate) fn with_schedule(
        synth: Option<S>,
        schedule: Schedule,
        sample_rate: u32,
        tail_seconds: f64,
        gain: f32,
    ) -> Self {
        let state = EngineState {
            synth,
            schedule,
            clock: PlaybackClock::new(sample_rate),
            playing: false,
            gain,
            tail_seconds,
        };
        Self {
            shared: Arc::new(Mutex::new(state)),
        }
    }

    /// Fills `out` with interleaved stereo frames.
    ///
    /// Never panics and never blocks on anything but the shared lock.
    /// When no synth is loaded, playback is stopped, the lock is poisoned,
    /// or rendering faults, the buffer is filled with silence.
    pub fn render(&self, out: &mut [f32]) {
        let Ok(mut state) = self.shared.lock() else {
            out.fill(0.0);
            return;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| state.render(out)));
        if result.is_err() {
            state.playing = false;
            out.fill(0.0);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Current clock position in seconds.
    pub fn current_time(&self) -> f64 {
        self.lock().clock.now()
    }

    /// Locks the shared state from the control thread.
    ///
    /// A poisoned lock is recovered: the control path must always be able
    /// to stop or clear.
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState<S>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
