//! Frame timing.
//!
//! [`FrameTimer`] measures the wall-clock gap between frames, clamps it so a
//! stall (window drag, breakpoint, suspend) does not teleport particles, and
//! keeps a periodically refreshed FPS figure for the window title.

use std::time::{Duration, Instant};

/// Largest time step handed to the simulation, in seconds.
pub const MAX_DELTA: f32 = 0.1;

/// How often the FPS figure is recomputed.
pub const FPS_INTERVAL: Duration = Duration::from_millis(250);

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct FrameTimer {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Clamped time since last frame in seconds.
    delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
}

impl FrameTimer {
    /// Create a timer starting from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
        }
    }

    /// Advance one frame. Returns the clamped delta and whether the FPS
    /// figure was refreshed.
    pub fn tick(&mut self) -> (f32, bool) {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> (f32, bool) {
        let raw_delta = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = raw_delta.min(MAX_DELTA);
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.saturating_duration_since(self.fps_update_time);
        let refreshed = fps_elapsed >= FPS_INTERVAL;
        if refreshed {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        (self.delta_secs, refreshed)
    }

    /// Clamped time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Most recent FPS measurement.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
