//! Time management utilities

use std::time::{Duration, Instant};

/// Frame timer: measures the delta between frames and keeps a frames-per-
/// second figure refreshed once per second.
pub struct Timer {
    last_frame: Instant,
    delta: Duration,
    window_start: Instant,
    frames_in_window: u32,
    fps: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta: Duration::ZERO,
            window_start: now,
            frames_in_window: 0,
            fps: 0.0,
            frame_count: 0,
        }
    }

    /// Restart the frame clock and return the time since the previous call
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Duration {
        self.delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;
        self.frames_in_window += 1;

        let window = now.duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            self.fps = self.frames_in_window as f32 / window.as_secs_f32();
            self.frames_in_window = 0;
            self.window_start = now;
        }
        self.delta
    }

    /// Time between the last two ticks
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Frames per second over the last completed one-second window
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Total number of ticks
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
