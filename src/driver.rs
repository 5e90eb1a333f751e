//! Frame loop driver and clock abstraction.
//!
//! The [`RenderLoop`] is a small state machine that owns the elapsed-time
//! clock and turns it into per-frame data. Rotation is a pure function of
//! elapsed time rather than accumulated per-frame deltas, so the animation
//! is deterministic and independent of frame rate.
//!
//! The clock is injected behind [`FrameClock`], which lets tests step frames
//! with [`ManualClock`] while the application uses [`MonotonicClock`].

use instant::{Duration, Instant};

/// Source of monotonic elapsed time for the frame loop.
pub trait FrameClock {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;
}

/// Real wall clock, cross-platform via the `instant` crate.
#[derive(Debug)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// A clock that only moves when told to. Used to step frames deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    pub fn set(&mut self, to: Duration) {
        self.now = to;
    }
}

impl FrameClock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now
    }
}

/// Loop lifecycle. The only transition the demo performs is `Idle -> Running`
/// at startup; `Running` then lasts for the lifetime of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Per-tick output: elapsed time, delta since the previous tick, and the
/// mesh rotation derived from elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub elapsed: Duration,
    pub dt: Duration,
    /// Rotation about the x and y axes in radians.
    pub rotation: (f32, f32),
}

/// Drives the per-frame update cycle.
///
/// `tick()` produces a [`Frame`] while running and `None` while idle. The
/// caller applies the frame to the scene, updates the camera controller and
/// issues the draw; re-scheduling is the caller's job (the winit app does it
/// via `request_redraw`).
pub struct RenderLoop<C> {
    clock: C,
    state: LoopState,
    rates: (f32, f32),
    last_tick: Option<Duration>,
}

impl<C: FrameClock> RenderLoop<C> {
    /// `rates` are the angular rates about the x and y axes in rad/s.
    pub fn new(clock: C, rates: (f32, f32)) -> Self {
        Self {
            clock,
            state: LoopState::Idle,
            rates,
            last_tick: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Access to the injected clock; tests use this to step a [`ManualClock`].
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn start(&mut self) {
        self.state = LoopState::Running;
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Idle;
        self.last_tick = None;
    }

    pub fn tick(&mut self) -> Option<Frame> {
        if self.state != LoopState::Running {
            return None;
        }
        let elapsed = self.clock.elapsed();
        let dt = match self.last_tick {
            Some(last) => elapsed.saturating_sub(last),
            None => Duration::ZERO,
        };
        self.last_tick = Some(elapsed);
        let secs = elapsed.as_secs_f32();
        Some(Frame {
            elapsed,
            dt,
            rotation: (self.rates.0 * secs, self.rates.1 * secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn idle_loop_produces_no_frames() {
        let mut looper = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
        assert_eq!(looper.state(), LoopState::Idle);
        assert!(looper.tick().is_none());
    }

    #[test]
    fn rotation_is_a_pure_function_of_elapsed_time() {
        let mut clock = ManualClock::new();
        clock.set(secs(10));
        let mut looper = RenderLoop::new(clock, (0.3, 0.6));
        looper.start();
        let frame = looper.tick().unwrap();
        assert!((frame.rotation.0 - 3.0).abs() < 1e-6);
        assert!((frame.rotation.1 - 6.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_does_not_depend_on_frame_count() {
        // One loop takes many small steps, the other jumps straight to t.
        let mut many = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
        many.start();
        let mut last = many.tick().unwrap();
        for _ in 0..1000 {
            many.clock.advance(Duration::from_millis(10));
            last = many.tick().unwrap();
        }

        let mut clock = ManualClock::new();
        clock.set(secs(10));
        let mut few = RenderLoop::new(clock, (0.3, 0.6));
        few.start();
        let single = few.tick().unwrap();

        assert_eq!(last.rotation, single.rotation);
    }

    #[test]
    fn dt_tracks_the_previous_tick() {
        let mut looper = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
        looper.start();
        assert_eq!(looper.tick().unwrap().dt, Duration::ZERO);
        looper.clock.advance(Duration::from_millis(16));
        assert_eq!(looper.tick().unwrap().dt, Duration::from_millis(16));
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut looper = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
        looper.start();
        assert!(looper.tick().is_some());
        looper.stop();
        assert_eq!(looper.state(), LoopState::Idle);
        assert!(looper.tick().is_none());
    }
}
