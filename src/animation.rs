//! Per-frame animation math.
//!
//! Everything here is pure: [`AnimationState::step`] takes the frame's
//! `dt` and the latest pointer position and returns the [`Pose`] to apply
//! to the model root. No clock is read, so any sequence of frames can be
//! replayed deterministically.

use std::f32::consts::PI;

use cgmath::Vector3;

use crate::{container::Rect, knight::INITIAL_YAW};

/// Upper bound of the pitch and roll gains, in radians per unit of pointer
/// offset.
pub const MAX_TILT_GAIN: f32 = PI / 8.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Autonomous spin around the vertical axis, radians per second.
    pub angular_velocity: f32,
    pub pitch_gain: f32,
    pub roll_gain: f32,
    /// Exponential approach rate toward the target orientation, per second.
    pub smoothing_rate: f32,
    pub bob_amplitude: f32,
    /// Radians per second.
    pub bob_frequency: f32,
    pub sway_amplitude: f32,
    pub sway_frequency: f32,
    /// Phase of the lateral sway relative to the depth sway.
    pub sway_phase: f32,
    pub breathing_amplitude: f32,
    pub breathing_frequency: f32,
    pub initial_yaw: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            angular_velocity: 0.18,
            pitch_gain: 0.2,
            roll_gain: 0.1,
            smoothing_rate: 1.8,
            bob_amplitude: 0.05,
            bob_frequency: 0.8,
            sway_amplitude: 0.02,
            sway_frequency: 0.5,
            sway_phase: 0.0,
            breathing_amplitude: 0.01,
            breathing_frequency: 1.2,
            initial_yaw: INITIAL_YAW,
        }
    }
}

impl AnimationConfig {
    /// Copy with tilt gains limited to `[0, MAX_TILT_GAIN]` and rates made
    /// non-negative.
    pub fn clamped(&self) -> Self {
        let gain = |g: f32| if g.is_finite() { g.clamp(0.0, MAX_TILT_GAIN) } else { 0.0 };
        let non_negative = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        if self.pitch_gain > MAX_TILT_GAIN || self.roll_gain > MAX_TILT_GAIN {
            log::warn!("tilt gains limited to {}", MAX_TILT_GAIN);
        }
        Self {
            pitch_gain: gain(self.pitch_gain),
            roll_gain: gain(self.roll_gain),
            smoothing_rate: non_negative(self.smoothing_rate),
            angular_velocity: if self.angular_velocity.is_finite() {
                self.angular_velocity
            } else {
                0.0
            },
            ..self.clone()
        }
    }
}

/// Pointer position normalized to the container: `x` grows to the right,
/// `y` grows upward, both in `[-1, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub fn new(x: f32, y: f32) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }

    /// Normalizes client coordinates against `rect`. Positions outside the
    /// container are clamped to its edges.
    pub fn from_client(client_x: f32, client_y: f32, rect: &Rect) -> Self {
        if !rect.is_measurable() {
            return Self::default();
        }
        Self::new(
            (client_x - rect.x) / rect.width * 2.0 - 1.0,
            -((client_y - rect.y) / rect.height * 2.0 - 1.0),
        )
    }
}

/// Euler angles in radians, applied in `XYZ` order.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// Transform offsets of the model root for one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    pub orientation: Orientation,
    /// Added to the resting position.
    pub offset: Vector3<f32>,
    /// Multiplies the resting scale.
    pub scale: f32,
}

#[derive(Clone, Debug)]
pub struct AnimationState {
    config: AnimationConfig,
    elapsed: f32,
    target: Orientation,
    current: Orientation,
}

impl AnimationState {
    pub fn new(config: &AnimationConfig) -> Self {
        let config = config.clamped();
        let rest = Orientation {
            pitch: 0.0,
            yaw: config.initial_yaw,
            roll: 0.0,
        };
        Self {
            config,
            elapsed: 0.0,
            target: rest,
            current: rest,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn target(&self) -> Orientation {
        self.target
    }

    pub fn current(&self) -> Orientation {
        self.current
    }

    /// Advances by `dt` seconds. Negative or non-finite `dt` counts as zero.
    pub fn step(&mut self, dt: f32, pointer: PointerState) -> Pose {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let c = &self.config;
        self.elapsed += dt;

        self.target.yaw += c.angular_velocity * dt;
        self.target.pitch = pointer.y * c.pitch_gain;
        self.target.roll = pointer.x * c.roll_gain;

        // Clamped so a long frame lands on the target instead of overshooting.
        let k = (c.smoothing_rate * dt).min(1.0);
        self.current.pitch += (self.target.pitch - self.current.pitch) * k;
        self.current.yaw += (self.target.yaw - self.current.yaw) * k;
        self.current.roll += (self.target.roll - self.current.roll) * k;

        self.pose()
    }

    /// Pose at the current clock without advancing it.
    pub fn pose(&self) -> Pose {
        let c = &self.config;
        let t = self.elapsed;
        let sway = t * c.sway_frequency;
        Pose {
            orientation: self.current,
            offset: Vector3::new(
                (sway + c.sway_phase).sin() * c.sway_amplitude,
                (t * c.bob_frequency).sin() * c.bob_amplitude,
                sway.cos() * c.sway_amplitude,
            ),
            scale: 1.0 + (t * c.breathing_frequency).sin() * c.breathing_amplitude,
        }
    }
}
