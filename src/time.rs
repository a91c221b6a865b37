//! Time facilities for effect timing.
//!
//! Every engine operation takes the current time explicitly as [`Millis`], so
//! the animation logic never reads a clock on its own. Hosts pick a clock:
//! [`SystemClock`] for a live window, [`ManualClock`] for tests and headless
//! renders.
//!
//! # Example
//!
//! ```ignore
//! use glyphtrail::time::{Clock, FrameStats, SystemClock};
//!
//! let clock = SystemClock::new();
//! let mut stats = FrameStats::new();
//!
//! // In your redraw handler:
//! stats.record(clock.now_ms());
//! println!("Frame: {} FPS: {:.1}", stats.frame(), stats.fps());
//! ```

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Milliseconds since a clock's origin.
pub type Millis = u64;

/// Source of the current time.
pub trait Clock {
    /// Milliseconds elapsed since the clock's origin.
    fn now_ms(&self) -> Millis;
}

/// Wall clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The instant `ms` milliseconds after this clock's origin, or `None`
    /// when that is beyond what the platform's `Instant` can represent.
    pub fn instant_at(&self, ms: Millis) -> Option<Instant> {
        self.origin.checked_add(Duration::from_millis(ms))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Clock that only moves when told to.
///
/// Interior mutability lets a shared reference advance it, which keeps test
/// harnesses simple when the clock is borrowed by several helpers.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    /// Create a clock at `start` milliseconds.
    pub fn starting_at(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Move the clock forward by `ms`.
    pub fn advance(&self, ms: Millis) -> Millis {
        let next = self.now.get().saturating_add(ms);
        self.now.set(next);
        next
    }

    /// Jump to an absolute time. Moving backwards is ignored.
    pub fn set(&self, now: Millis) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Frame counting and FPS estimation for a render loop.
#[derive(Debug)]
pub struct FrameStats {
    /// Time of the last recorded frame.
    last_frame: Option<Millis>,
    /// Time since the previous frame in milliseconds.
    delta_ms: Millis,
    /// Total frames recorded.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Millis,
    /// How often to update the FPS figure.
    fps_update_interval: Millis,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta_ms: 0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: 0,
            fps_update_interval: 500,
        }
    }

    /// Record a frame at `now`. Returns the delta since the previous frame.
    pub fn record(&mut self, now: Millis) -> Millis {
        let last = *self.last_frame.get_or_insert(now);
        self.delta_ms = now.saturating_sub(last);
        self.last_frame = Some(now);
        self.frame_count += 1;

        let since_update = now.saturating_sub(self.fps_update_time);
        if since_update >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 * 1000.0 / since_update as f32;
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta_ms
    }

    /// Milliseconds between the last two recorded frames.
    #[inline]
    pub fn delta(&self) -> Millis {
        self.delta_ms
    }

    /// Total frames recorded.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_at(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.advance(50), 150);
        assert_eq!(clock.now_ms(), 150);
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let clock = ManualClock::starting_at(100);
        clock.set(40);
        assert_eq!(clock.now_ms(), 100);
        clock.set(400);
        assert_eq!(clock.now_ms(), 400);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_instant_at_far_future_does_not_panic() {
        let clock = SystemClock::new();
        let soon = clock.instant_at(1_000).unwrap();
        assert_eq!(soon - clock.instant_at(0).unwrap(), Duration::from_secs(1));
        // Platform dependent whether this is representable
        let _ = clock.instant_at(Millis::MAX);
    }

    #[test]
    fn test_frame_stats_delta() {
        let mut stats = FrameStats::new();
        assert_eq!(stats.record(1000), 0);
        assert_eq!(stats.record(1016), 16);
        assert_eq!(stats.frame(), 2);
        assert_eq!(stats.delta(), 16);
    }

    #[test]
    fn test_frame_stats_fps() {
        let mut stats = FrameStats::new();
        // 60 frames spaced 10ms apart starting at t=0
        for i in 0..=60 {
            stats.record(i * 10);
        }
        // Last update happened at t=500 with 51 frames since the t=0 baseline
        assert!(stats.fps() > 90.0 && stats.fps() < 110.0, "fps = {}", stats.fps());
    }
}
