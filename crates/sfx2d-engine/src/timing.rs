//! Fixed-rate pacing for the tick loop.

use std::time::{Duration, Instant};

/// Longest step handed to the tick; a stalled frame must not skip whole fades.
const MAX_STEP_SECS: f32 = 0.25;

/// Paces the host loop at a target rate.
#[derive(Debug)]
pub struct FrameTiming {
    frame_budget: Duration,
    last_frame: Instant,
    /// Ticks and seconds handed out so far, for the average rate.
    ticks: u32,
    ticked_secs: f32,
}

impl FrameTiming {
    /// Paces at `target_fps` ticks per second (at least one).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame_budget: Duration::from_secs(1) / target_fps.max(1),
            last_frame: Instant::now(),
            ticks: 0,
            ticked_secs: 0.0,
        }
    }

    /// Wall time allotted to one tick.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Seconds since the previous call, capped at [`MAX_STEP_SECS`].
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let step = now.duration_since(self.last_frame).as_secs_f32().min(MAX_STEP_SECS);
        self.last_frame = now;
        self.ticks += 1;
        self.ticked_secs += step;
        step
    }

    /// Sleeps out what is left of the current tick's budget.
    pub fn sleep_remainder(&self) {
        if let Some(left) = self.frame_budget.checked_sub(self.last_frame.elapsed()) {
            std::thread::sleep(left);
        }
    }

    /// Average ticks per second so far.
    #[must_use]
    pub fn fps(&self) -> f32 {
        if self.ticked_secs > 0.0 {
            self.ticks as f32 / self.ticked_secs
        } else {
            0.0
        }
    }
}
