use std::time::{Duration, Instant};

/// Timing snapshot for one draw pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Time since the previous pass, clamped.
    pub elapsed: Duration,

    /// Time since the clock was created or last reset.
    pub total: Duration,

    /// Monotonic pass counter, starting at 0.
    pub frame_index: u64,
}

/// Produces [`FrameTime`] snapshots.
///
/// `elapsed` is clamped to `max_elapsed` so a control that was hidden or suspended
/// for a long time does not report one huge step on its next pass.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Option<Instant>,
    frame_index: u64,
    max_elapsed: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_elapsed(Duration::from_millis(250))
    }

    pub fn with_max_elapsed(max_elapsed: Duration) -> Self {
        Self {
            start: Instant::now(),
            last: None,
            frame_index: 0,
            max_elapsed,
        }
    }

    /// Restarts timing; the next tick reports zero elapsed time.
    ///
    /// The frame counter keeps counting.
    pub fn reset(&mut self) {
        self.start = Instant::now();
        self.last = None;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let elapsed = self
            .last
            .map(|last| now.saturating_duration_since(last).min(self.max_elapsed))
            .unwrap_or(Duration::ZERO);

        self.last = Some(now);

        let ft = FrameTime {
            elapsed,
            total: now.saturating_duration_since(self.start),
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
