//! Camera, projection and the orbit controller.
//!
//! The camera orbits a fixed target. [`OrbitController`] maps pointer drag
//! and scroll input onto yaw/pitch/radius velocities with inertial damping:
//! the velocities decay smoothly toward rest each frame, which is why the
//! controller needs an explicit per-frame [`update`](OrbitController::update).

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Velocities below this are snapped to rest so damping terminates.
const REST_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Window dimensions as last reported by the platform. Mutated only by the
/// resize handler; the camera aspect ratio derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Recompute the aspect ratio from a new viewport size. Safe to call
    /// repeatedly with the same size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::from_scale(1.0).into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.matrix() * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU-side camera state: the uniform, its buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera, projection: &Projection) {
        self.uniform.update_view_proj(camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Orbital camera controls with inertial damping.
///
/// Pointer drag feeds yaw/pitch velocity, scroll feeds zoom velocity.
/// [`update`](Self::update) integrates the velocities into the camera
/// position and decays them; with damping disabled the velocities are
/// consumed in a single frame instead.
#[derive(Debug)]
pub struct OrbitController {
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    radius: f32,
    target: Point3<f32>,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    sensitivity: f32,
    zoom_sensitivity: f32,
    pub enable_damping: bool,
    damping: f32,
    dragging: bool,
    last_touch: Option<(f64, f64)>,
}

impl OrbitController {
    /// Derive the initial orbit state from the camera's starting position.
    pub fn new(camera: &Camera, sensitivity: f32, damping: f32) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.magnitude().max(REST_EPSILON);
        let dir = offset / radius;
        Self {
            yaw: Rad(dir.x.atan2(dir.z)),
            pitch: Rad(dir.y.asin()),
            radius,
            target: camera.target,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            sensitivity,
            zoom_sensitivity: 0.25,
            enable_damping: true,
            damping,
            dragging: false,
            last_touch: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Feed a pointer-drag delta (pixels) into the orbit velocities.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.yaw_velocity -= dx as f32 * self.sensitivity;
        self.pitch_velocity += dy as f32 * self.sensitivity;
    }

    /// Positive deltas zoom in (shrink the orbit radius).
    pub fn handle_scroll(&mut self, delta: f32) {
        self.zoom_velocity += delta * self.zoom_sensitivity;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => match delta {
                MouseScrollDelta::LineDelta(_, y) => self.handle_scroll(*y),
                MouseScrollDelta::PixelDelta(pos) => self.handle_scroll(pos.y as f32 / 50.0),
            },
            WindowEvent::Touch(touch) => {
                let loc = (touch.location.x, touch.location.y);
                match touch.phase {
                    TouchPhase::Started => self.last_touch = Some(loc),
                    TouchPhase::Moved => {
                        if let Some((lx, ly)) = self.last_touch {
                            self.handle_mouse(loc.0 - lx, loc.1 - ly);
                        }
                        self.last_touch = Some(loc);
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => self.last_touch = None,
                }
            }
            _ => (),
        }
    }

    /// Integrate velocities into the orbit and reposition the camera.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();
        self.yaw += Rad(self.yaw_velocity * dt);
        self.pitch += Rad(self.pitch_velocity * dt);
        // Stay short of the poles so look_at keeps a well-defined up vector.
        let limit = std::f32::consts::FRAC_PI_2 - 0.05;
        self.pitch.0 = self.pitch.0.clamp(-limit, limit);
        self.radius = (self.radius * (1.0 - self.zoom_velocity * dt)).clamp(0.5, 50.0);

        if self.enable_damping {
            let decay = (-self.damping * dt).exp();
            self.yaw_velocity *= decay;
            self.pitch_velocity *= decay;
            self.zoom_velocity *= decay;
            if self.yaw_velocity.abs() < REST_EPSILON {
                self.yaw_velocity = 0.0;
            }
            if self.pitch_velocity.abs() < REST_EPSILON {
                self.pitch_velocity = 0.0;
            }
            if self.zoom_velocity.abs() < REST_EPSILON {
                self.zoom_velocity = 0.0;
            }
        } else {
            self.yaw_velocity = 0.0;
            self.pitch_velocity = 0.0;
            self.zoom_velocity = 0.0;
        }

        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let offset =
            Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.radius;
        camera.position = self.target + offset;
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    fn camera() -> Camera {
        Camera::new([0.0, 0.0, 2.0], [0.0, 0.0, 0.0])
    }

    #[test]
    fn resize_recomputes_aspect_from_latest_size() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 100.0);
        assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);
        projection.resize(1024, 256);
        assert!((projection.aspect() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 100.0);
        projection.resize(640, 480);
        let first = projection.matrix();
        projection.resize(640, 480);
        assert_eq!(first, projection.matrix());
    }

    #[test]
    fn zero_sized_viewport_is_ignored() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 100.0);
        let before = projection.aspect();
        projection.resize(0, 600);
        assert_eq!(before, projection.aspect());
    }

    #[test]
    fn controller_preserves_initial_camera_position() {
        let mut cam = camera();
        let mut controller = OrbitController::new(&cam, 0.005, 6.0);
        controller.update(&mut cam, Duration::from_millis(16));
        assert!((cam.position.z - 2.0).abs() < 1e-4);
        assert!(cam.position.x.abs() < 1e-4);
        assert!(cam.position.y.abs() < 1e-4);
    }

    #[test]
    fn damping_decays_velocity_toward_rest() {
        let mut cam = camera();
        let mut controller = OrbitController::new(&cam, 0.005, 6.0);
        controller.handle_mouse(100.0, 0.0);
        let initial = controller.yaw_velocity.abs();
        assert!(initial > 0.0);
        let mut previous = initial;
        for _ in 0..20 {
            controller.update(&mut cam, Duration::from_millis(16));
            assert!(controller.yaw_velocity.abs() <= previous);
            previous = controller.yaw_velocity.abs();
        }
        for _ in 0..2000 {
            controller.update(&mut cam, Duration::from_millis(16));
        }
        assert_eq!(controller.yaw_velocity, 0.0);
    }

    #[test]
    fn pitch_clamps_short_of_the_poles() {
        let mut cam = camera();
        let mut controller = OrbitController::new(&cam, 0.01, 6.0);
        for _ in 0..200 {
            controller.handle_mouse(0.0, 500.0);
            controller.update(&mut cam, Duration::from_millis(16));
        }
        assert!(controller.pitch.0 <= std::f32::consts::FRAC_PI_2 - 0.05 + 1e-6);
        // The camera still orbits at the configured radius.
        let offset = cam.position - cam.target;
        assert!((offset.magnitude() - controller.radius()).abs() < 1e-4);
    }

    #[test]
    fn camera_distance_stays_within_zoom_clamp() {
        let mut cam = camera();
        let mut controller = OrbitController::new(&cam, 0.005, 6.0);
        for _ in 0..500 {
            controller.handle_scroll(10.0);
            controller.update(&mut cam, Duration::from_millis(16));
        }
        assert!(controller.radius() >= 0.5);
    }
}
