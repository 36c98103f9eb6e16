use std::time::{Duration, Instant};

/// Source of per-frame elapsed time.
///
/// Each call to [`delta`](FrameClock::delta) returns the time elapsed since the
/// previous call and restarts the measurement.
pub trait FrameClock {
    fn delta(&mut self) -> Duration;

    /// Convenience wrapper returning the delta in seconds.
    fn delta_seconds(&mut self) -> f32 {
        self.delta().as_secs_f32()
    }
}

/// Timer for tracking frame timing and elapsed time.
pub struct Timer {
    start_time: Instant,
    last_update: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates a new timer starting from now.
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_update: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Updates the timer.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_update;
        self.elapsed = now - self.start_time;
        self.last_update = now;
        self.frame_count += 1;
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

impl FrameClock for Timer {
    fn delta(&mut self) -> Duration {
        self.tick();
        self.delta
    }
}

/// A clock driven by hand, for deterministic playback.
///
/// Queued steps are returned in order; once the queue is drained every query
/// returns [`Duration::ZERO`].
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    steps: std::collections::VecDeque<Duration>,
    /// Sum of every delta handed out so far
    pub elapsed: Duration,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that hands out the given deltas, in seconds.
    #[must_use]
    pub fn from_seconds(steps: &[f32]) -> Self {
        Self {
            steps: steps.iter().map(|s| Duration::from_secs_f32(*s)).collect(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, step: Duration) {
        self.steps.push_back(step);
    }
}

impl FrameClock for ManualClock {
    fn delta(&mut self) -> Duration {
        let step = self.steps.pop_front().unwrap_or(Duration::ZERO);
        self.elapsed += step;
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_drains_in_order() {
        let mut clock = ManualClock::from_seconds(&[0.5, 0.25]);
        assert!((clock.delta_seconds() - 0.5).abs() < 1e-6);
        assert!((clock.delta_seconds() - 0.25).abs() < 1e-6);
        assert_eq!(clock.delta(), Duration::ZERO);
        assert!((clock.elapsed.as_secs_f32() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn timer_counts_frames() {
        let mut timer = Timer::new();
        let _ = timer.delta();
        let _ = timer.delta();
        assert_eq!(timer.frame_count, 2);
        assert!(timer.elapsed >= timer.delta);
    }
}
