use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of frame durations averaged for the FPS estimate.
pub const FPS_WINDOW: usize = 240;

/// Wall-clock delta source for `tick`. The first call primes the clock and
/// yields zero.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self) -> f32 {
        self.advance_to(Instant::now())
    }

    pub fn advance_to(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Statistics returned by `finish_frame`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Zero-based index of the finished frame.
    pub frame: u64,
    /// Average frames per second over the window; zero until a duration is
    /// known.
    pub fps: f32,
    pub min_frame_time: Duration,
    pub max_frame_time: Duration,
    /// Number of durations currently in the window.
    pub samples: usize,
}

/// Rolling window over the last [`FPS_WINDOW`] frame durations.
#[derive(Debug)]
pub struct FrameTimer {
    window: VecDeque<Duration>,
    total: Duration,
    frames: u64,
    last_finish: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(FPS_WINDOW),
            total: Duration::ZERO,
            frames: 0,
            last_finish: None,
        }
    }

    /// Mark a frame finished now. The duration is measured from the previous
    /// finished frame; the first frame only starts the measurement.
    pub fn frame_finished(&mut self, now: Instant) -> FrameStats {
        if let Some(last) = self.last_finish {
            self.push(now.saturating_duration_since(last));
        }
        self.last_finish = Some(now);
        self.finish()
    }

    /// Record a known frame duration.
    pub fn record(&mut self, frame_time: Duration) -> FrameStats {
        self.push(frame_time);
        self.finish()
    }

    fn push(&mut self, frame_time: Duration) {
        if self.window.len() == FPS_WINDOW
            && let Some(old) = self.window.pop_front()
        {
            self.total -= old;
        }
        self.window.push_back(frame_time);
        self.total += frame_time;
    }

    fn finish(&mut self) -> FrameStats {
        let stats = self.stats();
        self.frames += 1;
        stats
    }

    pub fn stats(&self) -> FrameStats {
        let secs = self.total.as_secs_f32();
        FrameStats {
            frame: self.frames,
            fps: if secs > 0.0 {
                self.window.len() as f32 / secs
            } else {
                0.0
            },
            min_frame_time: self.window.iter().min().copied().unwrap_or_default(),
            max_frame_time: self.window.iter().max().copied().unwrap_or_default(),
            samples: self.window.len(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_advance_is_zero() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        assert_eq!(clock.advance_to(t0), 0.0);
        let dt = clock.advance_to(t0 + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn steady_frames_give_exact_fps() {
        let mut timer = FrameTimer::new();
        let mut stats = FrameStats::default();
        for _ in 0..10 {
            stats = timer.record(Duration::from_millis(20));
        }
        assert!((stats.fps - 50.0).abs() < 1e-3);
        assert_eq!(stats.frame, 9);
        assert_eq!(stats.samples, 10);
    }

    #[test]
    fn window_is_bounded() {
        let mut timer = FrameTimer::new();
        for _ in 0..FPS_WINDOW {
            timer.record(Duration::from_millis(100));
        }
        // A full window of fast frames pushes every slow frame out.
        let mut stats = FrameStats::default();
        for _ in 0..FPS_WINDOW {
            stats = timer.record(Duration::from_millis(10));
        }
        assert_eq!(stats.samples, FPS_WINDOW);
        assert!((stats.fps - 100.0).abs() < 0.5);
        assert_eq!(stats.max_frame_time, Duration::from_millis(10));
    }

    #[test]
    fn min_max_track_window() {
        let mut timer = FrameTimer::new();
        timer.record(Duration::from_millis(5));
        let stats = timer.record(Duration::from_millis(30));
        assert_eq!(stats.min_frame_time, Duration::from_millis(5));
        assert_eq!(stats.max_frame_time, Duration::from_millis(30));
    }

    #[test]
    fn first_finished_frame_has_no_duration() {
        let mut timer = FrameTimer::new();
        let t0 = Instant::now();
        let first = timer.frame_finished(t0);
        assert_eq!(first.samples, 0);
        assert_eq!(first.fps, 0.0);
        let second = timer.frame_finished(t0 + Duration::from_millis(25));
        assert_eq!(second.frame, 1);
        assert!((second.fps - 40.0).abs() < 1e-2);
    }
}
