//! Sample-driven playback clock.

/// Logical playback time, counted in rendered frames.
///
/// The clock never reads wall-clock time. It moves forward by exactly one
/// frame per rendered frame, so event timing does not depend on how the
/// host schedules audio callbacks. Seconds are derived from the frame
/// count, so long sessions do not accumulate rounding drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    frames: u64,
    sample_rate: u32,
}

impl PlaybackClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: 0,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Current position in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Number of frames rendered since the last reset.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Advances by one frame (`1 / sample_rate` seconds).
    #[inline]
    pub fn advance(&mut self) {
        self.frames += 1;
    }

    pub fn reset(&mut self) {
        self.frames = 0;
    }
}
