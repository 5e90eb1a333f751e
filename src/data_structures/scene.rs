//! Scene contents: the mesh, the lights and the camera.

use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::data_structures::mesh::Mesh;

/// Omnidirectional fill light.
#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 0.5,
        }
    }
}

/// Key light. The position only fixes the light direction; there is no
/// distance falloff.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: [2.0, 2.0, 5.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    position: [f32; 3],
    intensity: f32,
    color: [f32; 3],
    _padding: f32,
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
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
                label: Some("light_bind_group_layout"),
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

/// Everything that gets drawn plus the single camera observing it.
#[derive(Debug)]
pub struct Scene {
    pub mesh: Option<Mesh>,
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            mesh: None,
            ambient: AmbientLight::default(),
            directional: DirectionalLight::default(),
            camera,
        }
    }

    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.mesh = Some(mesh);
    }

    pub fn set_ambient_light(&mut self, light: AmbientLight) {
        self.ambient = light;
    }

    pub fn set_directional_light(&mut self, light: DirectionalLight) {
        self.directional = light;
    }

    pub fn light_uniform(&self) -> LightUniform {
        LightUniform {
            ambient: [
                self.ambient.color[0] * self.ambient.intensity,
                self.ambient.color[1] * self.ambient.intensity,
                self.ambient.color[2] * self.ambient.intensity,
                1.0,
            ],
            position: self.directional.position,
            intensity: self.directional.intensity,
            color: self.directional.color,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_uniform_premultiplies_the_ambient_term() {
        let scene = Scene::new(Camera::new((0.0, 0.0, 2.0), (0.0, 0.0, 0.0)));
        let uniform = scene.light_uniform();
        assert_eq!(uniform.ambient, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(uniform.position, [2.0, 2.0, 5.0]);
        assert_eq!(uniform.intensity, 1.0);
        assert_eq!(uniform.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn configured_lights_feed_the_uniform() {
        let mut scene = Scene::new(Camera::new((0.0, 0.0, 2.0), (0.0, 0.0, 0.0)));
        scene.set_ambient_light(AmbientLight {
            color: [1.0, 0.0, 0.0],
            intensity: 0.25,
        });
        scene.set_directional_light(DirectionalLight {
            color: [0.0, 1.0, 0.0],
            intensity: 2.0,
            position: [1.0, 0.0, 0.0],
        });
        let uniform = scene.light_uniform();
        assert_eq!(uniform.ambient, [0.25, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.color, [0.0, 1.0, 0.0]);
        assert_eq!(uniform.intensity, 2.0);
        assert_eq!(uniform.position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn light_uniform_is_48_bytes() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 48);
    }
}
