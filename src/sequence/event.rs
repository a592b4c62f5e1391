//! Scheduled note and program-change events.
//!
//! Each event carries its own playback state as a small one-way state
//! machine. Only the render engine advances these states; `play()` is the
//! only place that rewinds them.

/// Playback state of a scheduled note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteState {
    /// Waiting for the clock to reach the start time.
    #[default]
    Pending,
    /// Note-on has been sent, note-off has not.
    Sounding,
    /// Note-off has been sent.
    Released,
}

/// Playback state of a scheduled program change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    /// Waiting for the clock to reach the change time.
    #[default]
    Pending,
    /// The preset has been selected on the channel.
    Applied,
}

/// A note scheduled at an absolute time in seconds.
///
/// `end_time` is always `start_time + duration`. The duration is not
/// validated: a zero or negative duration yields a note whose note-off is
/// due as soon as its note-on has fired.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    /// Synth channel the note plays on.
    pub channel: u8,

    /// MIDI key number. 60 = Middle C.
    pub key: u8,

    /// Normalized velocity in `[0.0, 1.0]`.
    pub velocity: f32,

    /// Note-on time in seconds from the start of playback.
    pub start_time: f64,

    /// Note-off time in seconds from the start of playback.
    pub end_time: f64,

    state: NoteState,
}

impl ScheduledNote {
    /// Creates a pending note. Velocity is clamped to `[0.0, 1.0]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use soundseq::sequence::ScheduledNote;
    ///
    /// let note = ScheduledNote::new(0, 60, 1.5, 1.0, 0.5);
    /// assert_eq!(note.velocity, 1.0);
    /// assert_eq!(note.end_time, 1.5);
    /// ```
    pub fn new(channel: u8, key: u8, velocity: f32, start_time: f64, duration: f64) -> Self {
        Self {
            channel,
            key,
            velocity: clamp_velocity(velocity),
            start_time,
            end_time: start_time + duration,
            state: NoteState::Pending,
        }
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    /// True once note-on has been sent.
    pub fn is_started(&self) -> bool {
        matches!(self.state, NoteState::Sounding | NoteState::Released)
    }

    /// True once note-off has been sent.
    pub fn is_stopped(&self) -> bool {
        self.state == NoteState::Released
    }

    /// Whether note-on is due at clock time `now`.
    pub fn should_start(&self, now: f64) -> bool {
        self.state == NoteState::Pending && now >= self.start_time
    }

    /// Whether note-off is due at clock time `now`.
    pub fn should_stop(&self, now: f64) -> bool {
        self.state == NoteState::Sounding && now >= self.end_time
    }

    /// Pending -> Sounding. No effect in any other state.
    pub fn mark_started(&mut self) {
        if self.state == NoteState::Pending {
            self.state = NoteState::Sounding;
        }
    }

    /// Sounding -> Released. No effect in any other state, so a note can
    /// never be stopped without having been started.
    pub fn mark_stopped(&mut self) {
        if self.state == NoteState::Sounding {
            self.state = NoteState::Released;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = NoteState::Pending;
    }
}

/// A preset selection scheduled at an absolute time in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledProgram {
    /// Synth channel to switch.
    pub channel: u8,

    /// Preset index into the loaded SoundFont's preset list.
    pub program: usize,

    /// Time in seconds from the start of playback.
    pub time: f64,

    state: ProgramState,
}

impl ScheduledProgram {
    pub fn new(channel: u8, program: usize, time: f64) -> Self {
        Self {
            channel,
            program,
            time,
            state: ProgramState::Pending,
        }
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_applied(&self) -> bool {
        self.state == ProgramState::Applied
    }

    /// Whether the change is due at clock time `now`.
    pub fn is_due(&self, now: f64) -> bool {
        self.state == ProgramState::Pending && now >= self.time
    }

    pub fn mark_applied(&mut self) {
        self.state = ProgramState::Applied;
    }

    pub(crate) fn reset(&mut self) {
        self.state = ProgramState::Pending;
    }
}

/// Clamps a velocity to `[0.0, 1.0]`, mapping NaN to silence.
pub fn clamp_velocity(velocity: f32) -> f32 {
    if velocity.is_nan() {
        0.0
    } else {
        velocity.clamp(0.0, 1.0)
    }
}
