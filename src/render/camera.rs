use crate::render::pick::Ray;
use glam::{Mat4, Vec3};

const PITCH_LIMIT: f32 = 1.5;
const FOV_Y_DEGREES: f32 = 75.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

/// Held directional movement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraMovement {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl CameraMovement {
    pub fn set(&mut self, direction: MoveDirection, pressed: bool) {
        match direction {
            MoveDirection::Forward => self.move_forward = pressed,
            MoveDirection::Backward => self.move_backward = pressed,
            MoveDirection::Left => self.move_left = pressed,
            MoveDirection::Right => self.move_right = pressed,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any(&self) -> bool {
        self.move_forward || self.move_backward || self.move_left || self.move_right
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraController {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self::new(position, 0.0, 0.0);
        camera.look_at(target);
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() < 1e-12 {
            return;
        }
        let (yaw, pitch) = forward_to_yaw_pitch(forward);
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn forward(&self) -> Vec3 {
        self.basis().0
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let projection =
            Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect.max(1e-3), NEAR, FAR);
        projection * Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    /// Ray through the centre of the view, where the crosshair sits.
    pub fn center_ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    pub fn nudge(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        wrap_yaw(&mut self.yaw);
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    pub fn move_horizontal(&mut self, right: f32, forward: f32) {
        let yaw = self.yaw;
        let forward_dir = Vec3::new(yaw.cos(), 0.0, yaw.sin());
        let right_dir = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
        self.position += right_dir * right + forward_dir * forward;
    }

    pub fn update_movement(&mut self, input: &CameraMovement, speed: f32, frame_dt: f32) -> bool {
        let step = speed * frame_dt;

        let mut forward = 0.0;
        let mut right = 0.0;
        if input.move_forward {
            forward += step;
        }
        if input.move_backward {
            forward -= step;
        }
        if input.move_left {
            right -= step;
        }
        if input.move_right {
            right += step;
        }

        if forward != 0.0 || right != 0.0 {
            self.move_horizontal(right, forward);
            return true;
        }
        false
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let n = forward / forward.length().max(1e-6);
    let yaw = n.z.atan2(n.x);
    let pitch = n.y.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

fn wrap_yaw(yaw: &mut f32) {
    const TWO_PI: f32 = std::f32::consts::PI * 2.0;
    if yaw.is_finite() {
        *yaw = (*yaw + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI;
    }
}
