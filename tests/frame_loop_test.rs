//! Deterministic frame loop behavior through the public API.

use doorbox::{LoopState, ManualClock, RenderLoop};
use instant::Duration;

#[test]
fn ten_seconds_of_wall_time_give_the_expected_rotation() {
    let mut clock = ManualClock::new();
    clock.set(Duration::from_secs(10));
    let mut looper = RenderLoop::new(clock, (0.3, 0.6));
    looper.start();

    let frame = looper.tick().expect("running loop produces frames");
    assert!((frame.rotation.0 - 3.0).abs() < 1e-6);
    assert!((frame.rotation.1 - 6.0).abs() < 1e-6);
}

#[test]
fn rotation_is_independent_of_how_many_frames_ran() {
    let mut stepped = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
    stepped.start();
    let mut last = stepped.tick().expect("frame");
    // 625 * 16ms = 10s
    for _ in 0..625 {
        stepped.clock_mut().advance(Duration::from_millis(16));
        last = stepped.tick().expect("frame");
    }

    let mut clock = ManualClock::new();
    clock.set(Duration::from_secs(10));
    let mut jumped = RenderLoop::new(clock, (0.3, 0.6));
    jumped.start();
    let single = jumped.tick().expect("frame");

    assert_eq!(last.rotation, single.rotation);
    assert_eq!(last.elapsed, single.elapsed);
}

#[test]
fn loop_state_transitions_gate_frame_production() {
    let mut looper = RenderLoop::new(ManualClock::new(), (0.3, 0.6));
    assert_eq!(looper.state(), LoopState::Idle);
    assert!(looper.tick().is_none());

    looper.start();
    assert_eq!(looper.state(), LoopState::Running);
    assert!(looper.tick().is_some());

    looper.stop();
    assert_eq!(looper.state(), LoopState::Idle);
    assert!(looper.tick().is_none());

    // Restarting after a stop resets the dt baseline.
    looper.clock_mut().advance(Duration::from_secs(5));
    looper.start();
    let frame = looper.tick().expect("frame");
    assert_eq!(frame.dt, Duration::ZERO);
}
