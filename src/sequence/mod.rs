//! Sequencing data: scheduled events, the schedule store, and the
//! sample-driven playback clock.
//!
//! Times throughout are absolute seconds from the start of playback.

mod clock;
mod event;
mod schedule;

pub use clock::PlaybackClock;
pub use event::{clamp_velocity, NoteState, ProgramState, ScheduledNote, ScheduledProgram};
pub use schedule::Schedule;
