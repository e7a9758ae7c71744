use knight_scene::{
    SceneConfig, SceneHost,
    animation::{AnimationConfig, AnimationState, MAX_TILT_GAIN, PointerState},
    container::Rect,
    device::headless::HeadlessFactory,
    knight::{BASE_HEIGHT, BASE_SCALE, INITIAL_YAW},
};

use crate::common::test_utils::{ManualTicker, TestContainer, assert_close, env_map, mounted_host};

mod common;

const DT: f32 = 1.0 / 60.0;

#[test]
fn tilt_stays_bounded_at_pointer_extremes() {
    for (x, y) in [(1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)] {
        let mut state = AnimationState::new(&AnimationConfig::default());
        let pointer = PointerState::new(x, y);

        for _ in 0..1200 {
            let pose = state.step(DT, pointer);
            assert!(pose.orientation.pitch.abs() <= 0.3, "pitch {}", pose.orientation.pitch);
            assert!(pose.orientation.roll.abs() <= 0.15, "roll {}", pose.orientation.roll);
        }
        assert_close(state.target().pitch, 0.2 * y, 1e-6);
        assert_close(state.target().roll, 0.1 * x, 1e-6);
        assert_close(state.current().pitch, 0.2 * y, 1e-3);
    }
}

#[test]
fn pointer_outside_the_container_is_clamped() {
    let rect = Rect::new(100.0, 50.0, 200.0, 100.0);

    assert_eq!(PointerState::from_client(200.0, 100.0, &rect), PointerState::new(0.0, 0.0));
    assert_eq!(PointerState::from_client(100.0, 50.0, &rect), PointerState::new(-1.0, 1.0));
    assert_eq!(PointerState::from_client(300.0, 150.0, &rect), PointerState::new(1.0, -1.0));
    assert_eq!(PointerState::from_client(-5000.0, 9000.0, &rect), PointerState::new(-1.0, -1.0));
    assert_eq!(PointerState::new(f32::NAN, 7.0), PointerState::new(0.0, 1.0));
    assert_eq!(
        PointerState::from_client(10.0, 10.0, &Rect::from_size(0.0, 0.0)),
        PointerState::default()
    );
}

#[test]
fn tilt_gains_are_limited() {
    let config = AnimationConfig {
        pitch_gain: 10.0,
        roll_gain: f32::INFINITY,
        ..Default::default()
    };
    let mut state = AnimationState::new(&config);

    assert_eq!(state.config().pitch_gain, MAX_TILT_GAIN);
    assert_eq!(state.config().roll_gain, 0.0);

    for _ in 0..600 {
        let pose = state.step(DT, PointerState::new(1.0, 1.0));
        assert!(pose.orientation.pitch.abs() <= MAX_TILT_GAIN + 1e-6);
    }
}

#[test]
fn idle_spin_advances_at_constant_speed() {
    let config = AnimationConfig::default();
    let mut state = AnimationState::new(&config);
    assert_eq!(state.current().yaw, INITIAL_YAW);

    let frames = 600;
    let mut previous = state.current().yaw;
    for _ in 0..frames {
        let pose = state.step(DT, PointerState::default());
        assert!(pose.orientation.yaw > previous);
        previous = pose.orientation.yaw;
    }

    let expected = INITIAL_YAW + config.angular_velocity * frames as f32 * DT;
    assert_close(state.target().yaw, expected, 5e-4);

    // Steady-state lag of the exponential follower is ω / rate.
    let lag = config.angular_velocity / config.smoothing_rate;
    let current = state.current().yaw;
    assert!(current <= state.target().yaw);
    assert!(state.target().yaw - current <= lag + 1e-3);
}

#[test]
fn tilt_relaxes_when_the_pointer_is_centred() {
    let mut state = AnimationState::new(&AnimationConfig::default());
    for _ in 0..120 {
        state.step(DT, PointerState::new(1.0, -1.0));
    }
    assert!(state.current().pitch < -0.1);

    for _ in 0..600 {
        state.step(DT, PointerState::default());
    }
    assert_close(state.current().pitch, 0.0, 1e-3);
    assert_close(state.current().roll, 0.0, 1e-3);
}

#[test]
fn long_frames_land_on_the_target() {
    let mut state = AnimationState::new(&AnimationConfig::default());

    let pose = state.step(10.0, PointerState::new(-1.0, 1.0));

    assert_close(pose.orientation.yaw, state.target().yaw, 1e-6);
    assert_close(pose.orientation.pitch, 0.2, 1e-6);
    assert_close(pose.orientation.roll, -0.1, 1e-6);
}

#[test]
fn invalid_frame_times_do_not_advance_the_clock() {
    let mut state = AnimationState::new(&AnimationConfig::default());
    state.step(0.5, PointerState::default());
    let before = state.target();

    state.step(-1.0, PointerState::default());
    state.step(f32::NAN, PointerState::default());

    assert_eq!(state.elapsed(), 0.5);
    assert_eq!(state.target().yaw, before.yaw);
}

#[test]
fn float_sway_and_breathing_stay_within_their_amplitudes() {
    let config = AnimationConfig::default();
    let mut state = AnimationState::new(&config);

    for _ in 0..3600 {
        let pose = state.step(DT, PointerState::default());
        assert!(pose.offset.y.abs() <= config.bob_amplitude + 1e-6);
        assert!(pose.offset.x.abs() <= config.sway_amplitude + 1e-6);
        assert!(pose.offset.z.abs() <= config.sway_amplitude + 1e-6);
        assert!((pose.scale - 1.0).abs() <= config.breathing_amplitude + 1e-6);
    }

    let t = state.elapsed();
    let pose = state.pose();
    assert_close(pose.offset.y, (t * 0.8).sin() * 0.05, 1e-5);
    assert_close(pose.scale, 1.0 + (t * 1.2).sin() * 0.01, 1e-5);
}

#[test]
fn frames_move_the_model_root() {
    let (mut host, ticker, _factory) = mounted_host(400.0, 300.0);
    let root = host.model().unwrap().root();

    for _ in 0..90 {
        ticker.fire();
        host.frame(DT);
    }

    let pose = host.driver().unwrap().animation().pose();
    let node = host.context().unwrap().scene.node(root).unwrap();
    assert_close(node.local.position.y, BASE_HEIGHT + pose.offset.y, 1e-5);
    assert_close(node.local.scale.x, BASE_SCALE * pose.scale, 1e-5);
    assert_close(node.world().position.y, node.local.position.y, 1e-6);
}

#[test]
fn pointer_moves_feed_the_driver() {
    let ticker = ManualTicker::new();
    let mut container = TestContainer::new(200.0, 100.0);
    container.set_rect(Some(Rect::new(50.0, 20.0, 200.0, 100.0)));
    let mut host = SceneHost::new(container, SceneConfig::default(), ticker.clone());
    host.mount(env_map(), &mut HeadlessFactory::new());

    host.pointer_moved(250.0, 20.0);
    assert_eq!(host.driver().unwrap().pointer(), PointerState::new(1.0, 1.0));

    host.pointer_moved(150.0, 70.0);
    assert_eq!(host.driver().unwrap().pointer(), PointerState::new(0.0, 0.0));

    host.pointer_moved(250.0, 120.0);
    for _ in 0..600 {
        ticker.fire();
        host.frame(DT);
    }
    let current = host.driver().unwrap().animation().current();
    assert_close(current.pitch, -0.2, 1e-3);
    assert_close(current.roll, 0.1, 1e-3);
}
