//! Interaction & animation driver.
//!
//! The driver is a small state machine:
//!
//! ```text
//! Idle --attach--> Running --stop--> Stopped
//!   \______________stop______________/
//! ```
//!
//! While `Running`, every frame advances the [`AnimationState`], writes the
//! resulting pose into the model root, draws once and asks the
//! [`FrameTicker`] for the next frame. Pointer moves only store the latest
//! normalized position; smoothing happens in the frame.

use cgmath::Vector3;

use crate::{
    animation::{AnimationConfig, AnimationState, Pose, PointerState},
    container::Rect,
    context::Context,
    data_structures::transform::{Transform, euler_xyz},
    knight::KnightModel,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Stopped,
}

/// Schedules frames on the host's display refresh.
pub trait FrameTicker {
    /// Called once when the driver starts running.
    fn start(&mut self);

    /// Asks for one more frame.
    fn request_frame(&mut self);

    /// Cancels the outstanding frame request, if any.
    fn stop(&mut self);

    fn has_pending_frame(&self) -> bool;
}

pub struct Driver {
    state: DriverState,
    animation: AnimationState,
    pointer: PointerState,
    ticker: Box<dyn FrameTicker>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("state", &self.state)
            .field("animation", &self.animation)
            .field("pointer", &self.pointer)
            .finish()
    }
}

impl Driver {
    pub fn new(config: &AnimationConfig, ticker: Box<dyn FrameTicker>) -> Self {
        Self {
            state: DriverState::Idle,
            animation: AnimationState::new(config),
            pointer: PointerState::default(),
            ticker,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    /// Starts running once the model is in the scene and the device is
    /// usable. Returns whether the driver is running afterwards; calling it
    /// again while running is a no-op.
    pub fn attach(&mut self, context: &Context, model: &KnightModel) -> bool {
        match self.state {
            DriverState::Running => return true,
            DriverState::Stopped => return false,
            DriverState::Idle => {}
        }
        if !context.scene.contains(model.root()) || context.device.is_disposed() {
            log::debug!("driver stays idle: scene or device not ready");
            return false;
        }
        self.state = DriverState::Running;
        self.ticker.start();
        self.ticker.request_frame();
        log::debug!("driver running");
        true
    }

    /// Stores the pointer position normalized against `rect`.
    pub fn on_pointer_move(&mut self, client_x: f32, client_y: f32, rect: &Rect) {
        self.pointer = PointerState::from_client(client_x, client_y, rect);
    }

    /// Runs one frame of `dt` seconds. Ignored unless running.
    pub fn frame(&mut self, dt: f32, context: &mut Context, model: &KnightModel) -> bool {
        if self.state != DriverState::Running {
            return false;
        }
        let pose = self.animation.step(dt, self.pointer);
        match context.scene.node_mut(model.root()) {
            Some(root) => root.local = root_transform(model, &pose),
            None => log::warn!("model root missing from the scene"),
        }
        context.scene.update_world_transforms();
        context.render();
        self.ticker.request_frame();
        true
    }

    /// Stops for good and cancels the pending frame. Returns whether a frame
    /// request was outstanding.
    pub fn stop(&mut self) -> bool {
        let pending = self.ticker.has_pending_frame();
        if self.state != DriverState::Stopped {
            self.ticker.stop();
            self.state = DriverState::Stopped;
            log::debug!("driver stopped");
        }
        pending
    }
}

fn root_transform(model: &KnightModel, pose: &Pose) -> Transform {
    let o = pose.orientation;
    let scale = model.rest_scale() * pose.scale;
    Transform {
        position: model.rest_position() + pose.offset,
        rotation: euler_xyz(o.pitch, o.yaw, o.roll),
        scale: Vector3::new(scale, scale, scale),
    }
}
