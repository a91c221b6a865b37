//! Frame driver: repeating callbacks at a fixed interval or per display frame.
//!
//! The driver does not own a clock or a thread. The host calls [`FrameDriver::poll`]
//! from its event loop with the current time to fire due fixed-interval
//! callbacks, and [`FrameDriver::frame`] from its redraw handler to fire the
//! display-synced ones. Every callback is an explicit state update
//! `(state, now)`, so the same effect logic runs under a real window, a
//! headless loop or a unit test.
//!
//! # Example
//!
//! ```ignore
//! let mut driver = FrameDriver::<u32>::new();
//! let handle = driver.start(50, |count, _now| *count += 1);
//!
//! let mut count = 0;
//! for now in 0..=500 {
//!     driver.poll(&mut count, now);
//! }
//! assert_eq!(count, 10);
//! driver.stop(handle);
//! ```

use std::fmt;

use crate::time::Millis;

/// How often a callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every `n` milliseconds, checked on [`FrameDriver::poll`].
    Interval(Millis),
    /// Once per [`FrameDriver::frame`] call, i.e. per display refresh.
    DisplaySynced,
}

/// Handle returned by [`FrameDriver::start`], used to stop the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

type TickFn<S> = Box<dyn FnMut(&mut S, Millis)>;

struct Timer<S> {
    handle: TickHandle,
    cadence: Cadence,
    /// Next due time for interval timers. Unused for display-synced ones.
    next_due: Millis,
    on_tick: TickFn<S>,
}

/// Owner of all repeating callbacks for one engine instance.
pub struct FrameDriver<S> {
    timers: Vec<Timer<S>>,
    next_id: u64,
    /// Latest time observed through `poll`, `frame` or `set_now`.
    now: Millis,
}

impl<S> FrameDriver<S> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
            now: 0,
        }
    }

    /// Tell the driver what time it is without firing anything.
    ///
    /// Intervals started afterwards are due one interval after `now`.
    pub fn set_now(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }

    /// Begin a fixed-interval callback. A zero interval is treated as 1 ms;
    /// due times saturate at `Millis::MAX`, so a huge interval never fires.
    pub fn start<F>(&mut self, interval_ms: Millis, on_tick: F) -> TickHandle
    where
        F: FnMut(&mut S, Millis) + 'static,
    {
        let interval = interval_ms.max(1);
        let due = self.now.saturating_add(interval);
        self.insert(Cadence::Interval(interval), due, Box::new(on_tick))
    }

    /// Begin a callback invoked on every display frame.
    pub fn start_display_synced<F>(&mut self, on_frame: F) -> TickHandle
    where
        F: FnMut(&mut S, Millis) + 'static,
    {
        self.insert(Cadence::DisplaySynced, 0, Box::new(on_frame))
    }

    fn insert(&mut self, cadence: Cadence, next_due: Millis, on_tick: TickFn<S>) -> TickHandle {
        let handle = TickHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            handle,
            cadence,
            next_due,
            on_tick,
        });
        handle
    }

    /// Cancel a callback. Stopping an unknown or already stopped handle is a
    /// no-op; returns whether a callback was removed.
    pub fn stop(&mut self, handle: TickHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    /// Cancel every callback.
    pub fn stop_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_running(&self, handle: TickHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cadence of a running callback.
    pub fn cadence(&self, handle: TickHandle) -> Option<Cadence> {
        self.timers.iter().find(|t| t.handle == handle).map(|t| t.cadence)
    }

    /// Whether any display-synced callback is registered. Hosts keep requesting
    /// redraws while this is true.
    pub fn has_display_synced(&self) -> bool {
        self.timers
            .iter()
            .any(|t| t.cadence == Cadence::DisplaySynced)
    }

    /// Earliest due time among interval callbacks.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers
            .iter()
            .filter(|t| matches!(t.cadence, Cadence::Interval(_)))
            .map(|t| t.next_due)
            .min()
    }

    /// Fire every due interval callback at most once. Returns how many fired.
    ///
    /// A callback that fell behind by more than one interval is rescheduled
    /// relative to `now` instead of firing a burst of catch-up ticks.
    pub fn poll(&mut self, state: &mut S, now: Millis) -> usize {
        self.set_now(now);
        let now = self.now;
        let mut fired = 0;

        for timer in &mut self.timers {
            let Cadence::Interval(interval) = timer.cadence else {
                continue;
            };
            if timer.next_due > now {
                continue;
            }
            (timer.on_tick)(state, now);
            fired += 1;

            timer.next_due = timer.next_due.saturating_add(interval);
            if timer.next_due <= now {
                timer.next_due = now.saturating_add(interval);
            }
        }

        fired
    }

    /// Fire every display-synced callback once. Returns how many fired.
    pub fn frame(&mut self, state: &mut S, now: Millis) -> usize {
        self.set_now(now);
        let now = self.now;
        let mut fired = 0;

        for timer in &mut self.timers {
            if timer.cadence == Cadence::DisplaySynced {
                (timer.on_tick)(state, now);
                fired += 1;
            }
        }

        fired
    }
}

impl<S> Default for FrameDriver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for FrameDriver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDriver")
            .field("timers", &self.timers.len())
            .field("now", &self.now)
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}
