//! Frame timing for the render loop.

use std::time::{Duration, Instant};

/// Counts frames and reports a frame rate once per reporting interval.
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    window_start: Instant,
    frames_in_window: u32,
    total_frames: u64,
    interval: Duration,
}

impl FrameTimer {
    /// Create a timer that reports once per `interval`.
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            window_start: now,
            frames_in_window: 0,
            total_frames: 0,
            interval,
        }
    }

    /// Record one presented frame.
    ///
    /// Returns the frames-per-second of the elapsed reporting window once the
    /// interval has passed, `None` otherwise.
    pub fn frame(&mut self) -> Option<f64> {
        self.frame_at(Instant::now())
    }

    fn frame_at(&mut self, now: Instant) -> Option<f64> {
        self.frames_in_window += 1;
        self.total_frames += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let fps = f64::from(self.frames_in_window) / elapsed.as_secs_f64();
        self.window_start = now;
        self.frames_in_window = 0;
        Some(fps)
    }

    /// Total frames recorded since creation.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
