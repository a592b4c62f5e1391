//! soundseq - A sample-accurate SoundFont sequencer.
//!
//! Schedule notes and program changes at absolute times, then play them
//! through a SoundFont synthesizer in real time or bounce them to WAV.

pub mod audio;
pub mod config;
pub mod error;
pub mod sequence;
pub mod soundfont;

// Re-export commonly used types
pub use audio::{Player, RenderEngine, SAMPLE_RATE, TAIL_SECONDS};
pub use config::{PlayerConfig, Settings};
pub use error::{ConfigError, DeviceError, PlayerError, SynthError};
pub use sequence::{NoteState, ProgramState, Schedule, ScheduledNote, ScheduledProgram};
