//! The schedule store.
//!
//! Holds every pending note and program change in insertion order. The
//! render engine scans both lists once per frame, so iteration order is
//! also the tie-break order for events due on the same frame.

use super::event::{ScheduledNote, ScheduledProgram};

/// Ordered collection of scheduled events.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    notes: Vec<ScheduledNote>,
    programs: Vec<ScheduledProgram>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a note.
    ///
    /// # Arguments
    ///
    /// * `channel` - Synth channel
    /// * `key` - MIDI key number
    /// * `velocity` - Normalized velocity, clamped to `[0.0, 1.0]`
    /// * `start_time` - Note-on time in seconds
    /// * `duration` - Length in seconds (zero or negative is allowed)
    pub fn add_note(&mut self, channel: u8, key: u8, velocity: f32, start_time: f64, duration: f64) {
        self.notes
            .push(ScheduledNote::new(channel, key, velocity, start_time, duration));
    }

    /// Appends a program change.
    pub fn add_program(&mut self, channel: u8, program: usize, time: f64) {
        self.programs
            .push(ScheduledProgram::new(channel, program, time));
    }

    /// Removes every event.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.programs.clear();
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }

    pub fn programs(&self) -> &[ScheduledProgram] {
        &self.programs
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [ScheduledNote] {
        &mut self.notes
    }

    pub(crate) fn programs_mut(&mut self) -> &mut [ScheduledProgram] {
        &mut self.programs
    }

    /// True when no notes are scheduled. Program changes alone do not
    /// count as something to play.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Latest note end time in seconds, or 0.0 when nothing is scheduled.
    pub fn duration(&self) -> f64 {
        self.notes.iter().map(|n| n.end_time).fold(0.0, f64::max)
    }

    /// Latest time at which any event becomes due.
    ///
    /// Unlike [`Schedule::duration`] this also covers notes whose start
    /// lies after their end, and trailing program changes. Non-finite
    /// times are skipped since they can never become due.
    pub fn latest_event_time(&self) -> f64 {
        let notes = self
            .notes
            .iter()
            .flat_map(|n| [n.start_time, n.end_time]);
        let programs = self.programs.iter().map(|p| p.time);
        notes
            .chain(programs)
            .filter(|t| t.is_finite())
            .fold(0.0, f64::max)
    }

    /// True when every scheduled note has sent its note-off.
    pub fn all_notes_stopped(&self) -> bool {
        self.notes.iter().all(ScheduledNote::is_stopped)
    }

    /// Returns every event to its pending state.
    pub fn reset_states(&mut self) {
        for note in &mut self.notes {
            note.reset();
        }
        for pc in &mut self.programs {
            pc.reset();
        }
    }
}
