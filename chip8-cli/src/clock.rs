//! Frame pacing for the runner loop.
use std::{
    thread,
    time::{Duration, Instant},
};

use chip8::constants::*;

/// Splits execution into 60Hz frames of a fixed number of instruction ticks.
pub struct FramePacer {
    ticks_per_frame: u64,
    frame_time: Duration,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(ticks_per_frame: u64) -> Self {
        Self::with_frame_time(ticks_per_frame, Duration::from_nanos(CLOCK_CYCLE_TIME))
    }

    pub fn with_frame_time(ticks_per_frame: u64, frame_time: Duration) -> Self {
        Self {
            ticks_per_frame,
            frame_time,
            frame_start: Instant::now(),
        }
    }

    /// Instructions executed between two timer ticks.
    pub fn ticks_per_frame(&self) -> u64 {
        self.ticks_per_frame
    }

    /// Time left before the current frame is due to end.
    pub fn remaining(&self) -> Duration {
        self.frame_time.saturating_sub(self.frame_start.elapsed())
    }

    /// Block until the current frame has used up its time, and start the next one.
    ///
    /// Returns how far the frame ran past its time when it was already late.
    /// A late frame is not made up for by shortening the next one.
    pub fn wait(&mut self) -> Option<Duration> {
        let overrun = self
            .frame_start
            .elapsed()
            .checked_sub(self.frame_time)
            .filter(|late| !late.is_zero());

        if overrun.is_none() {
            // Sleep granularity is too coarse for a 16ms frame.
            while !self.remaining().is_zero() {
                thread::yield_now();
            }
        }

        self.frame_start = Instant::now();
        overrun
    }
}
